//! Asset Service: the per-request pipeline.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AssetService::serve                    │
//! │                                                               │
//! │  1. Resolve path (RootDir)        4. Directory → Listing      │
//! │     └─ missing? try "<path>.gz"      or 403 if disabled       │
//! │  2. Select rule (RouteTable)      5. File → conditional check │
//! │  3. Cache directive from rule        → read → negotiate gzip  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::HeaderMap;
use tracing::debug;

use crate::error::ServeError;
use crate::policy::{CacheControl, Encoded, Negotiator, Plan, RequestSignals, RouteTable, Validators};
use crate::resource::{Listing, Resource, ResourceKind, RootDir};

/// Content type of directory listings.
const LISTING_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// Asset Request
// =============================================================================

/// A request for an asset.
#[derive(Debug, Clone, Default)]
pub struct AssetRequest {
    /// Raw (still percent-encoded) URL path
    pub path: String,

    /// Encoding-related request headers
    pub signals: RequestSignals,

    /// `If-None-Match` header value
    pub if_none_match: Option<String>,

    /// `If-Modified-Since` header value
    pub if_modified_since: Option<String>,
}

impl AssetRequest {
    /// A request with no conditional or encoding headers.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build a request from a URL path and request headers.
    pub fn from_parts(path: impl Into<String>, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            path: path.into(),
            signals: RequestSignals::from_headers(headers),
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
        }
    }
}

// =============================================================================
// Asset Response
// =============================================================================

/// What kind of body an [`AssetResponse`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetBody {
    /// File content
    File,

    /// JSON directory listing
    Listing,

    /// `304 Not Modified`, empty body
    NotModified,
}

/// A negotiated response.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub kind: AssetBody,

    /// Encoded body (empty for `NotModified`)
    pub body: Bytes,

    /// MIME type of the identity representation
    pub content_type: String,

    /// `Content-Encoding`, if the body is encoded
    pub content_encoding: Option<&'static str>,

    /// Directive from the matched rule
    pub cache: CacheControl,

    /// `ETag` / `Last-Modified`, files only
    pub validators: Option<Validators>,

    /// Whether to send `Vary: Accept-Encoding`
    pub vary: bool,

    /// gzip ratio when compressed on the fly
    pub compression_ratio: Option<f64>,

    /// Name of the matched route rule
    pub rule: String,
}

// =============================================================================
// Asset Service
// =============================================================================

/// Serves files and listings from a root directory.
///
/// All state is immutable after construction, so the service is shared
/// across requests behind an `Arc` without locking.
///
/// # Example
///
/// ```ignore
/// use static_tiles::asset::{AssetRequest, AssetService};
///
/// let service = AssetService::new(root, rules, negotiator);
/// let response = service.serve(&AssetRequest::new("/figs/a.png")).await?;
/// println!("{} bytes via rule {}", response.body.len(), response.rule);
/// ```
#[derive(Debug)]
pub struct AssetService {
    root: RootDir,
    rules: RouteTable,
    negotiator: Arc<Negotiator>,
}

impl AssetService {
    pub fn new(root: RootDir, rules: RouteTable, negotiator: Negotiator) -> Self {
        Self {
            root,
            rules,
            negotiator: Arc::new(negotiator),
        }
    }

    pub fn root(&self) -> &RootDir {
        &self.root
    }

    pub fn rules(&self) -> &RouteTable {
        &self.rules
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// Serve one request.
    ///
    /// # Errors
    ///
    /// - [`ServeError::InvalidPath`] / [`ServeError::NotFound`] from resolution
    /// - [`ServeError::Forbidden`] for a directory whose rule disables listing
    /// - [`ServeError::Io`] for read, listing or decompression failures
    pub async fn serve(&self, request: &AssetRequest) -> Result<AssetResponse, ServeError> {
        let (resource, precompressed) = self.resolve(&request.path).await?;

        // Route on the requested name, not the `.gz` sibling
        let name = if precompressed {
            resource.name().strip_suffix(".gz").unwrap_or(resource.name())
        } else {
            resource.name()
        };
        let rule = self.rules.select(name);
        debug!(path = %request.path, rule = %rule.name, "Route selected");

        match resource.kind {
            ResourceKind::Directory => {
                if !rule.policy.listing {
                    return Err(ServeError::Forbidden {
                        path: request.path.clone(),
                    });
                }
                self.serve_listing(request, &resource, rule.policy.cache, &rule.name)
                    .await
            }
            ResourceKind::File { size, modified } => {
                let content_type = mime_guess::from_path(name)
                    .first_or_octet_stream()
                    .to_string();
                let plan = self.negotiator.plan(
                    &content_type,
                    usize::try_from(size).unwrap_or(usize::MAX),
                    &rule.policy.cache,
                    &request.signals,
                    precompressed,
                );

                // Re-encoded bodies are not byte-identical to the stored file
                let validators = Validators::for_file(size, modified);
                let validators = if plan.is_cpu_bound() {
                    validators.weak()
                } else {
                    validators
                };

                if validators.is_not_modified(
                    request.if_none_match.as_deref(),
                    request.if_modified_since.as_deref(),
                ) {
                    return Ok(AssetResponse {
                        kind: AssetBody::NotModified,
                        body: Bytes::new(),
                        content_type,
                        content_encoding: None,
                        cache: rule.policy.cache,
                        validators: Some(validators),
                        vary: plan.varies(),
                        compression_ratio: None,
                        rule: rule.name.clone(),
                    });
                }

                let data = tokio::fs::read(&resource.path)
                    .await
                    .map_err(|e| ServeError::from_io(request.path.as_str(), e))?;
                let encoded = self.encode(&request.path, plan, Bytes::from(data)).await?;

                Ok(AssetResponse {
                    kind: AssetBody::File,
                    body: encoded.body,
                    content_type,
                    content_encoding: encoded.content_encoding,
                    cache: rule.policy.cache,
                    validators: Some(validators),
                    vary: encoded.vary,
                    compression_ratio: encoded.ratio,
                    rule: rule.name.clone(),
                })
            }
        }
    }

    /// Resolve the request path, falling back to a stored `<path>.gz`
    /// representation when the path itself is missing.
    async fn resolve(&self, path: &str) -> Result<(Resource, bool), ServeError> {
        match self.root.resolve(path).await {
            Ok(resource) => Ok((resource, false)),
            Err(ServeError::NotFound { path: missing }) => {
                if path.ends_with('/') {
                    return Err(ServeError::NotFound { path: missing });
                }
                match self.root.resolve(&format!("{path}.gz")).await {
                    Ok(resource) if !resource.is_dir() => {
                        debug!(path = %path, "Serving stored gzip representation");
                        Ok((resource, true))
                    }
                    _ => Err(ServeError::NotFound { path: missing }),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn serve_listing(
        &self,
        request: &AssetRequest,
        resource: &Resource,
        cache: CacheControl,
        rule: &str,
    ) -> Result<AssetResponse, ServeError> {
        let listing = Listing::read(&resource.path)
            .await
            .map_err(|e| ServeError::from_io(request.path.as_str(), e))?;
        let json = listing.to_json().map_err(|e| ServeError::Io {
            path: request.path.clone(),
            source: io::Error::other(e),
        })?;

        let plan = self.negotiator.plan(
            LISTING_CONTENT_TYPE,
            json.len(),
            &cache,
            &request.signals,
            false,
        );
        let encoded = self.encode(&request.path, plan, Bytes::from(json)).await?;

        Ok(AssetResponse {
            kind: AssetBody::Listing,
            body: encoded.body,
            content_type: LISTING_CONTENT_TYPE.to_string(),
            content_encoding: encoded.content_encoding,
            cache,
            validators: None,
            vary: encoded.vary,
            compression_ratio: encoded.ratio,
            rule: rule.to_string(),
        })
    }

    /// Apply an encoding plan, moving gzip work off the async workers.
    async fn encode(&self, path: &str, plan: Plan, body: Bytes) -> Result<Encoded, ServeError> {
        let io_error = |source| ServeError::Io {
            path: path.to_string(),
            source,
        };

        if !plan.is_cpu_bound() {
            return self.negotiator.apply(plan, body).map_err(io_error);
        }

        let negotiator = Arc::clone(&self.negotiator);
        tokio::task::spawn_blocking(move || negotiator.apply(plan, body))
            .await
            .map_err(|e| io_error(io::Error::other(e)))?
            .map_err(io_error)
    }
}
