use std::io::{self, Read, Write};

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{ACCEPT_ENCODING, CACHE_CONTROL};
use http::HeaderMap;

use super::cache::CacheControl;

/// Bodies smaller than this are sent as-is.
pub const DEFAULT_GZIP_MIN_LENGTH: usize = 1000;

/// Default gzip level (1 = fastest, 9 = best).
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// MIME types compressed by default. Images are already compressed.
pub const DEFAULT_GZIP_TYPES: &[&str] = &[
    "text/plain",
    "text/css",
    "text/html",
    "text/javascript",
    "application/javascript",
    "application/json",
    "application/xml",
    "image/svg+xml",
];

/// Compression settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Master switch for on-the-fly gzip
    pub enabled: bool,

    /// Compressible MIME essences, lowercase
    pub mime_types: Vec<String>,

    /// Minimum body size in bytes
    pub min_size: usize,

    /// gzip level 0-9
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mime_types: DEFAULT_GZIP_TYPES.iter().map(|t| t.to_string()).collect(),
            min_size: DEFAULT_GZIP_MIN_LENGTH,
            level: DEFAULT_GZIP_LEVEL,
        }
    }
}

/// Parsed `Accept-Encoding`, reduced to what this server can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptEncoding {
    gzip: bool,
}

impl AcceptEncoding {
    /// Parse an `Accept-Encoding` header value.
    ///
    /// `gzip` (or `x-gzip`) with q > 0 is accepted; otherwise `*` with q > 0
    /// is. An explicit `gzip;q=0` overrides `*`.
    pub fn parse(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };

        let mut gzip_q: Option<f32> = None;
        let mut any_q: Option<f32> = None;

        for item in header.split(',') {
            let mut params = item.split(';');
            let coding = params.next().unwrap_or("").trim().to_ascii_lowercase();
            let q = params
                .filter_map(|p| {
                    let p = p.trim();
                    p.strip_prefix("q=").or_else(|| p.strip_prefix("Q="))
                })
                .find_map(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            match coding.as_str() {
                "gzip" | "x-gzip" => gzip_q = Some(q),
                "*" => any_q = Some(q),
                _ => {}
            }
        }

        let gzip = match gzip_q {
            Some(q) => q > 0.0,
            None => any_q.is_some_and(|q| q > 0.0),
        };
        Self { gzip }
    }

    pub fn gzip(&self) -> bool {
        self.gzip
    }
}

/// Request headers that influence encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSignals {
    pub accept: AcceptEncoding,

    /// Request carried `Cache-Control: no-transform`
    pub no_transform: bool,
}

impl RequestSignals {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accept = AcceptEncoding::parse(
            headers
                .get(ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );

        let no_transform = headers.get_all(CACHE_CONTROL).iter().any(|v| {
            v.to_str()
                .map(|s| {
                    s.split(',')
                        .any(|d| d.trim().eq_ignore_ascii_case("no-transform"))
                })
                .unwrap_or(false)
        });

        Self {
            accept,
            no_transform,
        }
    }
}

/// What to do with a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Send the stored bytes unchanged. `vary` is set when another client
    /// could have been sent a gzip body for the same resource.
    Identity { vary: bool },

    /// Compress on the fly
    Gzip,

    /// Stored bytes are gzip and the client accepts gzip
    Passthrough,

    /// Stored bytes are gzip and the client does not accept gzip
    Gunzip,
}

impl Plan {
    /// Whether applying the plan costs CPU proportional to the body size.
    pub fn is_cpu_bound(&self) -> bool {
        matches!(self, Plan::Gzip | Plan::Gunzip)
    }

    /// Whether the response depends on `Accept-Encoding`, and so must carry
    /// `Vary: Accept-Encoding`.
    pub fn varies(&self) -> bool {
        !matches!(self, Plan::Identity { vary: false })
    }
}

/// An encoded body ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub body: Bytes,

    /// `Content-Encoding` value, if any
    pub content_encoding: Option<&'static str>,

    /// Original size / compressed size, when compressed on the fly
    pub ratio: Option<f64>,

    /// Response should carry `Vary: Accept-Encoding`
    pub vary: bool,
}

/// Per-request gzip negotiation.
#[derive(Debug, Clone)]
pub struct Negotiator {
    config: CompressionConfig,
}

impl Negotiator {
    pub fn new(config: CompressionConfig) -> Self {
        let mut config = config;
        for t in &mut config.mime_types {
            *t = t.trim().to_ascii_lowercase();
        }
        config.level = config.level.min(9);
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Whether a `Content-Type` is in the compressible set. Parameters such
    /// as `charset` are ignored.
    pub fn is_compressible(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.config.mime_types.iter().any(|t| *t == essence)
    }

    /// Decide how to encode a body.
    ///
    /// # Arguments
    ///
    /// * `content_type` - MIME type of the identity representation
    /// * `len` - size of the stored bytes
    /// * `cache` - directive the response will carry
    /// * `signals` - request headers
    /// * `precompressed` - the stored bytes are a `.gz` representation
    pub fn plan(
        &self,
        content_type: &str,
        len: usize,
        cache: &CacheControl,
        signals: &RequestSignals,
        precompressed: bool,
    ) -> Plan {
        if precompressed {
            return if signals.accept.gzip() {
                Plan::Passthrough
            } else {
                Plan::Gunzip
            };
        }

        if !self.config.enabled
            || !self.is_compressible(content_type)
            || len < self.config.min_size
            || cache.forbids_transform()
        {
            return Plan::Identity { vary: false };
        }

        if signals.no_transform || !signals.accept.gzip() {
            return Plan::Identity { vary: true };
        }

        Plan::Gzip
    }

    /// Carry out a plan.
    pub fn apply(&self, plan: Plan, body: Bytes) -> io::Result<Encoded> {
        match plan {
            Plan::Identity { vary } => Ok(Encoded {
                body,
                content_encoding: None,
                ratio: None,
                vary,
            }),
            Plan::Gzip => {
                let compressed = gzip(&body, self.config.level)?;
                let ratio = if compressed.is_empty() {
                    None
                } else {
                    Some(body.len() as f64 / compressed.len() as f64)
                };
                Ok(Encoded {
                    body: Bytes::from(compressed),
                    content_encoding: Some("gzip"),
                    ratio,
                    vary: true,
                })
            }
            Plan::Passthrough => Ok(Encoded {
                body,
                content_encoding: Some("gzip"),
                ratio: None,
                vary: true,
            }),
            Plan::Gunzip => Ok(Encoded {
                body: Bytes::from(gunzip(&body)?),
                content_encoding: None,
                ratio: None,
                vary: true,
            }),
        }
    }
}

/// gzip-compress `data` at `level`.
pub fn gzip(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a gzip stream, concatenating every member.
pub fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 3);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
