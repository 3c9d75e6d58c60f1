use std::io;
use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::record::AccessRecord;

/// Records buffered by a [`FileSink`] before new ones are dropped.
pub const DEFAULT_FILE_SINK_CAPACITY: usize = 4096;

/// Destination for access records.
///
/// Called on the request path after the response is built, so
/// implementations must not block and must not fail.
pub trait AccessSink: Send + Sync + 'static {
    fn record(&self, record: AccessRecord);
}

/// Emits each record as a structured `tracing` event on the `access_log`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AccessSink for TracingSink {
    fn record(&self, record: AccessRecord) {
        info!(
            target: "access_log",
            status = record.status,
            bytes = record.body_bytes,
            gzip_ratio = record.gzip_ratio,
            latency_ms = record.request_time.as_secs_f64() * 1000.0,
            "{}",
            record
        );
    }
}

/// Appends log lines to a writer from a background task.
///
/// The request path only pushes onto a bounded channel; when it is full the
/// record is dropped with a warning rather than delaying the response.
#[derive(Debug, Clone)]
pub struct FileSink {
    tx: mpsc::Sender<AccessRecord>,
}

impl FileSink {
    /// Open `path` for appending (creating parent directories) and start the
    /// writer task. Must be called within a Tokio runtime.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self::spawn(file, DEFAULT_FILE_SINK_CAPACITY))
    }

    /// Start a writer task draining into `writer`.
    pub fn spawn<W>(writer: W, capacity: usize) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(write_records(writer, rx));
        Self { tx }
    }
}

impl AccessSink for FileSink {
    fn record(&self, record: AccessRecord) {
        if let Err(e) = self.tx.try_send(record) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("Access log queue full, dropping record")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!("Access log writer stopped, dropping record")
                }
            }
        }
    }
}

async fn write_records<W>(mut writer: W, mut rx: mpsc::Receiver<AccessRecord>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(record) = rx.recv().await {
        let line = format!("{record}\n");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(error = %e, "Failed to write access log record");
            continue;
        }
        // Flush once the burst is drained
        if rx.is_empty() {
            if let Err(e) = writer.flush().await {
                warn!(error = %e, "Failed to flush access log");
            }
        }
    }
    let _ = writer.flush().await;
}
