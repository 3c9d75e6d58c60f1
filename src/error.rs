use thiserror::Error;

/// Errors that terminate a single request.
///
/// None of these are retried; each maps to exactly one HTTP status
/// (see the `IntoResponse` impl in `server::handlers`).
#[derive(Debug, Error)]
pub enum ServeError {
    /// The request path is malformed or normalizes outside the root directory
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    /// The resolved path does not exist
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Directory listing is disabled for the matched route rule
    #[error("Directory listing forbidden: {path}")]
    Forbidden { path: String },

    /// Stat or read failure other than a missing entry
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ServeError {
    /// Classify an I/O error raised while touching `path`.
    ///
    /// `NotFound` (including a non-directory path component) becomes
    /// [`ServeError::NotFound`]; everything else is an I/O failure.
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => ServeError::NotFound { path },
            // ENOTDIR: "a.png/x" where a.png is a regular file
            _ if cfg!(unix) && err.raw_os_error() == Some(20) => ServeError::NotFound { path },
            _ => ServeError::Io { path, source: err },
        }
    }

    /// Short machine-readable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ServeError::InvalidPath { .. } => "invalid_path",
            ServeError::NotFound { .. } => "not_found",
            ServeError::Forbidden { .. } => "forbidden",
            ServeError::Io { .. } => "io_error",
        }
    }
}

/// Route table configuration errors, reported once at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    /// No rule matches every path
    #[error("Route table has no catch-all rule")]
    MissingCatchAll,

    /// Two rules share a precedence value, so their order would be implicit
    #[error("Rules '{first}' and '{second}' share precedence {precedence}")]
    AmbiguousPrecedence {
        first: String,
        second: String,
        precedence: u32,
    },

    /// A suffix rule was configured without any suffixes
    #[error("Suffix rule '{rule}' has no suffixes")]
    EmptySuffixes { rule: String },
}
