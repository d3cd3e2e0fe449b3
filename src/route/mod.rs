use std::sync::Arc;

use catalog::Catalog;

use crate::broadcast::LiveSession;

pub mod archive;
pub mod ws;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub session: Arc<LiveSession>,
}
