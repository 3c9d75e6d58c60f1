//! Per-request policy: which rule governs a path, what cache directive it
//! gets, and whether its body is gzip-encoded.
//!
//! # Components
//!
//! - [`RouteTable`]: ordered route rules, selected highest precedence first
//! - [`CacheControl`]: the `Cache-Control` directive attached by a rule
//! - [`Validators`]: `ETag` / `Last-Modified` and conditional request checks
//! - [`Negotiator`]: gzip negotiation against `Accept-Encoding`

mod cache;
mod compress;
mod rules;

pub use cache::{CacheControl, Validators};
pub use compress::{
    gunzip, gzip, AcceptEncoding, CompressionConfig, Encoded, Negotiator, Plan, RequestSignals,
    DEFAULT_GZIP_LEVEL, DEFAULT_GZIP_MIN_LENGTH, DEFAULT_GZIP_TYPES,
};
pub use rules::{RoutePolicy, RouteRule, RouteTable, RuleMatch};
