use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, Level};

use crate::broadcast::LiveSession;
use crate::config::Config;
use crate::route::{archive, ws, AppState};

pub use crate::error::AppError;

pub mod config;

mod broadcast;
mod error;
mod result;
mod route;

pub async fn server_up<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    std::fs::create_dir_all(&cfg.recording.dir).expect("create recording directory");
    let catalog = Arc::new(catalog::Catalog::open(&cfg.storage.database).expect("open catalog"));
    let session = Arc::new(LiveSession::new(
        catalog.clone(),
        &cfg.recording.dir,
        &cfg.recording.ext,
    ));
    let app_state = AppState {
        catalog,
        session: session.clone(),
    };

    let app = Router::new()
        .merge(ws::route())
        .merge(archive::route())
        .nest_service("/recordings", ServeDir::new(&cfg.recording.dir))
        .with_state(app_state)
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                    )
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        );

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));

    // leave no record marked live behind a clean shutdown
    session.force_stop().await;
}
