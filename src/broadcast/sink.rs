use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Exclusive append-only byte sink for one live session's recording file.
pub struct RecordingSink {
    path: PathBuf,
    file: Option<File>,
}

impl RecordingSink {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .await?;
        debug!("recording sink open: {}", path.display());
        Ok(RecordingSink {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort append: a failed write drops this fragment and keeps the
    /// session going.
    pub async fn append(&mut self, data: &[u8]) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(data).await {
            warn!(
                "recording sink append failed on {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Idempotent; safe on an already-closed or never-opened sink.
    pub async fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.shutdown().await {
                debug!(
                    "recording sink close error on {}: {}",
                    self.path.display(),
                    e
                );
            }
            debug!("recording sink closed: {}", self.path.display());
        }
    }
}
