use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use http::header::{CACHE_CONTROL, ETAG, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue};

/// HTTP date format (RFC 7231 IMF-fixdate).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A `Cache-Control` response directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheControl {
    /// Lifetime in seconds
    pub max_age: u32,

    /// `private` instead of `public`
    pub private: bool,

    /// `no-store`, overrides everything else
    pub no_store: bool,

    /// `no-transform`
    pub no_transform: bool,
}

impl CacheControl {
    /// `public, max-age=<max_age>`
    pub fn public(max_age: u32) -> Self {
        Self {
            max_age,
            private: false,
            no_store: false,
            no_transform: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    pub fn no_transform(mut self) -> Self {
        self.no_transform = true;
        self
    }

    /// Whether intermediaries (and this server) must not re-encode the body.
    pub fn forbids_transform(&self) -> bool {
        self.private || self.no_store || self.no_transform
    }

    /// Render the header value.
    pub fn header_value(&self) -> String {
        if self.no_store {
            return "no-store".to_string();
        }

        let scope = if self.private { "private" } else { "public" };
        let mut value = format!("{}, max-age={}", scope, self.max_age);
        if self.no_transform {
            value.push_str(", no-transform");
        }
        value
    }

    /// Set `Cache-Control` on a response. Never touches anything else.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            headers.insert(CACHE_CONTROL, value);
        }
    }
}

/// Validators for a served file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted entity tag, possibly weak (`W/"..."`)
    pub etag: String,

    /// Modification time, truncated to whole seconds
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    /// Build validators from file size and modification time.
    ///
    /// The tag has the form `"<mtime hex>-<size hex>"`, so it changes whenever
    /// the file is rewritten without reading its content.
    pub fn for_file(size: u64, modified: Option<SystemTime>) -> Self {
        let mtime = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let last_modified = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.as_secs() as i64, 0));

        Self {
            etag: format!("\"{:x}-{:x}\"", mtime, size),
            last_modified,
        }
    }

    /// Mark the tag weak. Used when the body is re-encoded.
    pub fn weak(mut self) -> Self {
        if !self.etag.starts_with("W/") {
            self.etag = format!("W/{}", self.etag);
        }
        self
    }

    /// `Last-Modified` header value.
    pub fn last_modified_value(&self) -> Option<String> {
        self.last_modified
            .map(|t| t.format(HTTP_DATE_FORMAT).to_string())
    }

    /// Evaluate `If-None-Match` / `If-Modified-Since`.
    ///
    /// `If-None-Match` takes precedence when present and uses weak
    /// comparison. `If-Modified-Since` is only consulted without it.
    pub fn is_not_modified(
        &self,
        if_none_match: Option<&str>,
        if_modified_since: Option<&str>,
    ) -> bool {
        if let Some(header) = if_none_match {
            let ours = opaque_tag(&self.etag);
            return header
                .split(',')
                .map(str::trim)
                .any(|tag| tag == "*" || opaque_tag(tag) == ours);
        }

        match (if_modified_since, self.last_modified) {
            (Some(since), Some(modified)) => DateTime::parse_from_rfc2822(since.trim())
                .map(|since| modified <= since.with_timezone(&Utc))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Set `ETag` and `Last-Modified`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.etag) {
            headers.insert(ETAG, value);
        }
        if let Some(value) = self
            .last_modified_value()
            .and_then(|v| HeaderValue::from_str(&v).ok())
        {
            headers.insert(LAST_MODIFIED, value);
        }
    }
}

fn opaque_tag(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
