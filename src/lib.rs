//! # Static Tiles
//!
//! A small, high-throughput HTTP server for pre-rendered image tiles and the
//! JSON metadata that sits next to them.
//!
//! ## Features
//!
//! - **Route rules**: long cache lifetimes for image suffixes, short ones for
//!   everything else, with explicit precedence
//! - **Directory listings**: sorted JSON arrays of `{name, type}` entries
//! - **gzip negotiation**: on-the-fly compression for text types, plus stored
//!   `.gz` representations served as-is or decompressed per client
//! - **Conditional requests**: `ETag` / `Last-Modified` with `304` responses
//! - **Access log**: one nginx-compatible line per request
//!
//! ## Architecture
//!
//! - [`resource`] - Root directory confinement, path resolution and listings
//! - [`policy`] - Route rules, cache directives and compression negotiation
//! - [`asset`] - The per-request pipeline tying the above together
//! - [`access`] - Access records and sinks
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use static_tiles::{create_router, AssetService, Negotiator, RootDir, RouterConfig};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = static_tiles::Config::parse_from(["static-tiles", "--root", "/srv/tiles"]);
//!
//!     let assets = AssetService::new(
//!         RootDir::open(&config.root)?,
//!         config.route_table()?,
//!         Negotiator::new(config.compression()),
//!     );
//!     let router = create_router(assets, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod asset;
pub mod config;
pub mod error;
pub mod policy;
pub mod resource;
pub mod server;

// Re-export commonly used types
pub use access::{AccessRecord, AccessSink, FileSink, TracingSink};
pub use asset::{AssetBody, AssetRequest, AssetResponse, AssetService};
pub use config::Config;
pub use error::{RuleError, ServeError};
pub use policy::{
    CacheControl, CompressionConfig, Negotiator, RoutePolicy, RouteRule, RouteTable, RuleMatch,
    Validators,
};
pub use resource::{EntryKind, Listing, ListingEntry, Resource, ResourceKind, RootDir};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
