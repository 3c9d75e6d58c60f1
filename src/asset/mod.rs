//! Asset service layer.
//!
//! Turns a request path plus a few request headers into a fully negotiated
//! response body, independent of the HTTP framework.
//!
//! # Components
//!
//! - [`AssetService`]: resolves, routes, lists or reads, and encodes
//! - [`AssetRequest`]: path and the request headers that matter
//! - [`AssetResponse`]: body, content type, encoding and headers to attach

mod service;

pub use service::{AssetBody, AssetRequest, AssetResponse, AssetService};
