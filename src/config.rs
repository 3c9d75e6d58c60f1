//! Configuration management for the static tile server.
//!
//! Configuration comes from command-line arguments with `TILES_` environment
//! variable fallbacks, is validated once at startup and is immutable
//! afterwards.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use static_tiles::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! let rules = config.route_table()?;
//! println!("Serving {} on {}", config.root.display(), config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `TILES_HOST` - Server bind address (default: 0.0.0.0)
//! - `TILES_PORT` - Server port (default: 8080)
//! - `TILES_ROOT` - Directory to serve (required)
//! - `TILES_IMAGE_EXTENSIONS` - Suffixes of the image rule (default: png)
//! - `TILES_IMAGE_MAX_AGE` / `TILES_DEFAULT_MAX_AGE` - Cache lifetimes
//! - `TILES_GZIP`, `TILES_GZIP_MIN_LENGTH`, `TILES_GZIP_LEVEL`, `TILES_GZIP_TYPES`
//! - `TILES_ACCESS_LOG` - Append access records to this file
//! - `TILES_CORS_ORIGINS` - Allowed CORS origins

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::error::RuleError;
use crate::policy::{
    CacheControl, CompressionConfig, RoutePolicy, RouteRule, RouteTable, RuleMatch,
    DEFAULT_GZIP_LEVEL, DEFAULT_GZIP_MIN_LENGTH, DEFAULT_GZIP_TYPES,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default image cache lifetime in seconds (1 hour).
pub const DEFAULT_IMAGE_MAX_AGE: u32 = 3600;

/// Default cache lifetime for everything else, in seconds.
pub const DEFAULT_MAX_AGE: u32 = 10;

/// Precedence of the image rule; above the catch-all.
pub const IMAGE_RULE_PRECEDENCE: u32 = 100;

/// Precedence of the catch-all rule.
pub const DEFAULT_RULE_PRECEDENCE: u32 = 0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Static tile server - serves rendered image tiles and their metadata from
/// a directory tree.
#[derive(Parser, Debug, Clone)]
#[command(name = "static-tiles")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TILES_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TILES_PORT")]
    pub port: u16,

    /// Directory to serve.
    #[arg(long, env = "TILES_ROOT")]
    pub root: PathBuf,

    // =========================================================================
    // Route Rules
    // =========================================================================
    /// File suffixes served with the image policy (comma-separated).
    #[arg(
        long,
        env = "TILES_IMAGE_EXTENSIONS",
        value_delimiter = ',',
        default_value = "png"
    )]
    pub image_extensions: Vec<String>,

    /// Cache-Control max-age for images, in seconds.
    #[arg(long, default_value_t = DEFAULT_IMAGE_MAX_AGE, env = "TILES_IMAGE_MAX_AGE")]
    pub image_max_age: u32,

    /// Cache-Control max-age for everything else, in seconds.
    #[arg(long, default_value_t = DEFAULT_MAX_AGE, env = "TILES_DEFAULT_MAX_AGE")]
    pub default_max_age: u32,

    /// Allow directory listings for paths matching the image rule.
    #[arg(long, default_value_t = false, action = ArgAction::Set, env = "TILES_IMAGE_LISTING")]
    pub image_listing: bool,

    /// Allow directory listings for all other paths.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TILES_DEFAULT_LISTING")]
    pub default_listing: bool,

    // =========================================================================
    // Compression
    // =========================================================================
    /// Enable on-the-fly gzip compression.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "TILES_GZIP")]
    pub gzip: bool,

    /// Minimum body size in bytes before compressing.
    #[arg(long, default_value_t = DEFAULT_GZIP_MIN_LENGTH, env = "TILES_GZIP_MIN_LENGTH")]
    pub gzip_min_length: usize,

    /// gzip compression level (1-9).
    #[arg(long, default_value_t = DEFAULT_GZIP_LEVEL, env = "TILES_GZIP_LEVEL")]
    pub gzip_level: u32,

    /// MIME types eligible for compression (comma-separated).
    #[arg(
        long,
        env = "TILES_GZIP_TYPES",
        value_delimiter = ',',
        default_values_t = DEFAULT_GZIP_TYPES.iter().map(|t| t.to_string())
    )]
    pub gzip_types: Vec<String>,

    // =========================================================================
    // Access Log
    // =========================================================================
    /// Append access log lines to this file instead of emitting them as
    /// tracing events.
    #[arg(long, env = "TILES_ACCESS_LOG")]
    pub access_log: Option<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "TILES_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration.
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("Root directory is required. Set --root or TILES_ROOT".to_string());
        }

        if !self.root.is_dir() {
            return Err(format!(
                "Root directory {} does not exist or is not a directory",
                self.root.display()
            ));
        }

        if self.image_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err("image_extensions must name at least one suffix".to_string());
        }

        if !(1..=9).contains(&self.gzip_level) {
            return Err("gzip_level must be between 1 and 9".to_string());
        }

        if self.gzip && self.gzip_types.iter().all(|t| t.trim().is_empty()) {
            return Err("gzip_types must not be empty when gzip is enabled".to_string());
        }

        Ok(())
    }

    /// Get the socket address to bind to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the two-tier route table: images, then everything else.
    pub fn route_table(&self) -> Result<RouteTable, RuleError> {
        RouteTable::new(vec![
            RouteRule::new(
                "images",
                IMAGE_RULE_PRECEDENCE,
                RuleMatch::suffixes(&self.image_extensions),
                RoutePolicy {
                    cache: CacheControl::public(self.image_max_age),
                    listing: self.image_listing,
                },
            ),
            RouteRule::new(
                "default",
                DEFAULT_RULE_PRECEDENCE,
                RuleMatch::Any,
                RoutePolicy {
                    cache: CacheControl::public(self.default_max_age),
                    listing: self.default_listing,
                },
            ),
        ])
    }

    /// Compression settings for the negotiator.
    pub fn compression(&self) -> CompressionConfig {
        CompressionConfig {
            enabled: self.gzip,
            mime_types: self
                .gzip_types
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            min_size: self.gzip_min_length,
            level: self.gzip_level,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
