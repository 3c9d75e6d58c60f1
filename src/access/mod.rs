//! Access logging.
//!
//! Every request produces exactly one [`AccessRecord`], built by the
//! access-log middleware and handed to an injected [`AccessSink`]. Sinks are
//! best-effort: a failed write is logged and dropped, never surfaced to the
//! client.

mod record;
mod sink;

pub use record::{AccessRecord, CompressionRatio};
pub use sink::{AccessSink, FileSink, TracingSink, DEFAULT_FILE_SINK_CAPACITY};
