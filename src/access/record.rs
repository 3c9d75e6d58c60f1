use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Response extension carrying the gzip ratio from the handler to the
/// access-log middleware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionRatio(pub f64);

/// One handled request.
///
/// The [`Display`](fmt::Display) form is the log line consumed downstream; its
/// field order is fixed:
///
/// ```text
/// $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent
///   "$http_referer" "$http_user_agent" "$http_x_forwarded_for" "$gzip_ratio" $request_time
/// ```
///
/// Absent values are written as `-`.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    /// Client IP address
    pub remote_addr: Option<String>,

    /// Authenticated user; this server performs no authentication
    pub remote_user: Option<String>,

    /// When the request was received
    pub time: DateTime<Local>,

    /// `METHOD /path?query HTTP/x.y`
    pub request_line: String,

    pub status: u16,

    /// Body bytes sent, after encoding
    pub body_bytes: u64,

    pub referer: Option<String>,

    pub user_agent: Option<String>,

    /// `X-Forwarded-For` as received
    pub forwarded_for: Option<String>,

    /// Original / compressed size, if gzip was applied on the fly
    pub gzip_ratio: Option<f64>,

    /// Time from receipt to response headers
    pub request_time: Duration,
}

impl AccessRecord {
    /// Start a record for a request received now.
    pub fn new(request_line: impl Into<String>) -> Self {
        Self {
            remote_addr: None,
            remote_user: None,
            time: Local::now(),
            request_line: request_line.into(),
            status: 0,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            forwarded_for: None,
            gzip_ratio: None,
            request_time: Duration::ZERO,
        }
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ratio = self
            .gzip_ratio
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string());

        write!(
            f,
            "{} - {} [{}] \"{}\" {} {} \"{}\" \"{}\" \"{}\" \"{}\" {:.3}",
            self.remote_addr.as_deref().unwrap_or("-"),
            self.remote_user.as_deref().unwrap_or("-"),
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            escape(&self.request_line),
            self.status,
            self.body_bytes,
            escape(self.referer.as_deref().unwrap_or("-")),
            escape(self.user_agent.as_deref().unwrap_or("-")),
            escape(self.forwarded_for.as_deref().unwrap_or("-")),
            ratio,
            self.request_time.as_secs_f64(),
        )
    }
}

/// Escape quotes, backslashes and control characters so one record is
/// always one line with intact quoting.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\x22"),
            '\\' => out.push_str("\\x5C"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
