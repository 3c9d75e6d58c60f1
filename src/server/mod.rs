//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 GET|HEAD /{path}   GET /health                  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │  access_log  │  │        routes          │  │
//! │  │ (requests)  │  │ (middleware) │  │  (router config)       │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod access_log;
pub mod handlers;
pub mod routes;

pub use access_log::access_log_middleware;
pub use handlers::{asset_handler, health_handler, AppState, ErrorResponse, HealthResponse};
pub use routes::{create_router, RouterConfig};
