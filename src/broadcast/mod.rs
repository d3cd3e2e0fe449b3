use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Local;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use catalog::{Catalog, NewBroadcast};

use crate::broadcast::message::ListenerEvent;
use crate::broadcast::relay::Relay;
use crate::broadcast::sink::RecordingSink;

pub mod message;
pub mod relay;
pub mod sink;


const EVENT_CAPACITY: usize = 64;

/// In-memory state of the one permitted live broadcast.
///
/// Recoverable from the catalog on restart except for the start instant;
/// a session adopted after a restart therefore ends with an unknown duration.
struct SessionInner {
    active_id: Option<i64>,
    started_at: Option<Instant>,
    sink: Option<RecordingSink>,
    last_stamp: String,
    stamp_seq: u32,
}

impl SessionInner {
    /// Filenames are second-resolution timestamps; a monotonic suffix keeps
    /// two starts within the same second apart.
    fn next_filename(&mut self, stamp: String, ext: &str) -> String {
        if stamp == self.last_stamp {
            self.stamp_seq += 1;
            format!("siaran_{}_{}.{}", stamp, self.stamp_seq, ext)
        } else {
            self.last_stamp = stamp;
            self.stamp_seq = 0;
            format!("siaran_{}.{}", self.last_stamp, ext)
        }
    }
}

/// The live-session state machine.
///
/// All start/stop/force-stop transitions and sink appends are serialized
/// through one mutex; listener delivery goes through the [`Relay`] and never
/// waits on disk.
pub struct LiveSession {
    catalog: Arc<Catalog>,
    relay: Relay,
    recording_dir: PathBuf,
    recording_ext: String,
    inner: Mutex<SessionInner>,
}

impl LiveSession {
    /// Reconciles with the catalog: a row left live by a previous run is
    /// adopted as the active broadcast, with its start instant lost.
    pub fn new(catalog: Arc<Catalog>, recording_dir: impl Into<PathBuf>, ext: &str) -> Self {
        let active_id = match catalog.find_live() {
            Ok(Some(rec)) => {
                warn!(
                    "adopting broadcast {} left live by a previous run, start instant lost",
                    rec.id
                );
                Some(rec.id)
            }
            Ok(None) => None,
            Err(e) => {
                error!("live broadcast lookup failed: {}", e);
                None
            }
        };
        LiveSession {
            catalog,
            relay: Relay::new(EVENT_CAPACITY),
            recording_dir: recording_dir.into(),
            recording_ext: ext.to_string(),
            inner: Mutex::new(SessionInner {
                active_id,
                started_at: None,
                sink: None,
                last_stamp: String::new(),
                stamp_seq: 0,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
        self.relay.subscribe()
    }

    /// Begin a new live broadcast, pre-empting any session still marked live.
    ///
    /// A sink that fails to open leaves the broadcast live but unrecorded;
    /// that is a degraded mode, not an error.
    pub async fn start(&self, title: &str, date: &str, start_time: &str) -> anyhow::Result<i64> {
        let mut inner = self.inner.lock().await;
        self.preempt(&mut inner).await;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let filename = inner.next_filename(stamp, &self.recording_ext);
        let id = self.catalog.create(&NewBroadcast {
            title: title.to_string(),
            broadcast_date: date.to_string(),
            start_time: start_time.to_string(),
            filename: filename.clone(),
        })?;
        inner.active_id = Some(id);
        inner.started_at = Some(Instant::now());

        let path = self.recording_dir.join(&filename);
        match RecordingSink::open(&path).await {
            Ok(sink) => inner.sink = Some(sink),
            Err(e) => {
                error!(
                    "broadcast {} live without recording, sink open failed on {}: {}",
                    id,
                    path.display(),
                    e
                );
            }
        }

        self.relay.dispatch(ListenerEvent::Started {
            title: title.to_string(),
        });
        info!("broadcast {} '{}' started, recording to {}", id, title, filename);
        Ok(id)
    }

    /// Clean stop with a client-reported end time label.
    ///
    /// Idempotent when idle: no record is touched, listeners still get a
    /// `Stopped` event.
    pub async fn stop(&self, end_time: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(mut sink) = inner.sink.take() {
            sink.close().await;
        }
        let duration = inner.started_at.map(|t0| t0.elapsed().as_secs() as i64);
        if let Some(id) = inner.active_id.take() {
            self.finalize_record(id, end_time, duration);
            info!("broadcast {} stopped", id);
        }
        inner.started_at = None;
        self.relay.dispatch(ListenerEvent::Stopped);
    }

    /// Abnormal termination without client-reported timing, used when the
    /// broadcaster connection is lost. Duration is left unknown. Safe to call
    /// at any time, including when idle.
    pub async fn force_stop(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut sink) = inner.sink.take() {
            sink.close().await;
        }
        if let Some(id) = inner.active_id.take() {
            self.finalize_record(id, &clock_label(), None);
            warn!("broadcast {} force-stopped", id);
        }
        inner.started_at = None;
        self.relay.dispatch(ListenerEvent::Stopped);
    }

    /// Relay one audio fragment to all listeners and append it to the active
    /// recording. Relay dispatch happens before the session lock is taken, so
    /// listener delivery never waits on disk IO.
    pub async fn ingest(&self, data: Bytes) {
        self.relay.dispatch(ListenerEvent::Audio(data.clone()));
        let mut inner = self.inner.lock().await;
        if let Some(sink) = inner.sink.as_mut() {
            sink.append(&data).await;
        }
    }

    /// Finalize whatever record is still live, in memory or in the catalog.
    /// The abandoned session keeps no trustworthy timing, so its duration
    /// stays unknown.
    async fn preempt(&self, inner: &mut SessionInner) {
        if let Some(mut sink) = inner.sink.take() {
            sink.close().await;
        }
        inner.active_id = None;
        inner.started_at = None;

        let live = self.catalog.find_live().unwrap_or_else(|e| {
            error!("live broadcast lookup failed: {}", e);
            None
        });
        if let Some(rec) = live {
            warn!("pre-empting live broadcast {}", rec.id);
            self.finalize_record(rec.id, &clock_label(), None);
        }
    }

    fn finalize_record(&self, id: i64, end_time: &str, duration: Option<i64>) {
        match self.catalog.finalize(id, end_time, duration) {
            Ok(true) => {}
            Ok(false) => warn!("broadcast {} vanished from catalog, update skipped", id),
            Err(e) => error!("failed to finalize broadcast {}: {}", id, e),
        }
    }
}

fn clock_label() -> String {
    Local::now().format("%H:%M").to_string()
}
