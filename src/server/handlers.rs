//! HTTP request handlers for the static tile server.
//!
//! # Endpoints
//!
//! - `GET|HEAD /{path}` - Serve a file or a directory listing
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::access::CompressionRatio;
use crate::asset::{AssetBody, AssetRequest, AssetResponse, AssetService};
use crate::error::ServeError;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the asset service.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<AssetService>,
}

impl AppState {
    pub fn new(assets: AssetService) -> Self {
        Self {
            assets: Arc::new(assets),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl ServeError {
    /// HTTP status for this error.
    ///
    /// Invalid paths are reported as 404 so traversal attempts cannot discover
    /// files outside the root.
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::InvalidPath { .. } | ServeError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServeError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServeError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert ServeError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s at DEBUG level (common and expected)
/// - other 4xx at WARN level
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.kind();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        // I/O details stay in the server log
        let message = match &self {
            ServeError::Io { path, .. } => format!("Failed to read {}", path),
            other => other.to_string(),
        };

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve a file or directory listing.
///
/// # Endpoint
///
/// `GET|HEAD /{path}` (router fallback)
///
/// # Response
///
/// - `200 OK`: file bytes or a JSON listing
/// - `304 Not Modified`: validators matched
/// - `403 Forbidden`: directory whose rule disables listing
/// - `404 Not Found`: missing, or outside the root directory
/// - `405 Method Not Allowed`: anything but GET and HEAD
/// - `500 Internal Server Error`: read failure
///
/// # Headers
///
/// - `Content-Type`, `Cache-Control` from the matched rule
/// - `ETag`, `Last-Modified` for files
/// - `Content-Encoding: gzip` and `Vary: Accept-Encoding` when negotiated
pub async fn asset_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return method_not_allowed(&method);
    }

    let request = AssetRequest::from_parts(uri.path(), &headers);
    match state.assets.serve(&request).await {
        Ok(asset) => build_response(asset, method == Method::HEAD),
        Err(e) => e.into_response(),
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn method_not_allowed(method: &Method) -> Response {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    let body = ErrorResponse::with_status(
        "method_not_allowed",
        format!("Method {} not allowed", method),
        status,
    );
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Turn a negotiated asset into an HTTP response.
fn build_response(asset: AssetResponse, head: bool) -> Response {
    let mut headers = HeaderMap::new();
    asset.cache.apply(&mut headers);
    if let Some(validators) = &asset.validators {
        validators.apply(&mut headers);
    }
    if asset.vary {
        headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
    }

    if asset.kind == AssetBody::NotModified {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response.headers_mut().extend(headers);
        return response;
    }

    if let Ok(value) = HeaderValue::from_str(&asset.content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(encoding) = asset.content_encoding {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.body.len()));

    let body = if head {
        Body::empty()
    } else {
        Body::from(asset.body)
    };

    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().extend(headers);
    if let Some(ratio) = asset.compression_ratio {
        response.extensions_mut().insert(CompressionRatio(ratio));
    }
    response
}
