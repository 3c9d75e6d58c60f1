use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use crate::error::ServeError;

/// The directory tree the server is allowed to expose.
///
/// The root is canonicalized once at startup; every resolved path is checked
/// against it after symlinks are followed.
#[derive(Debug, Clone)]
pub struct RootDir {
    root: PathBuf,
}

/// What a request path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A regular file
    File {
        size: u64,
        modified: Option<SystemTime>,
    },

    /// A directory
    Directory,
}

/// A filesystem entry inside the root directory.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Canonical absolute path on disk
    pub path: PathBuf,

    /// Normalized path relative to the root, as requested (before symlinks)
    pub relative: PathBuf,

    /// File or directory
    pub kind: ResourceKind,
}

impl Resource {
    /// Whether this resource is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ResourceKind::Directory)
    }

    /// Final component of the requested path, empty for the root itself.
    ///
    /// Route rules match against this name rather than the symlink target.
    pub fn name(&self) -> &str {
        self.relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

impl RootDir {
    /// Open the root directory, canonicalizing it.
    ///
    /// Fails if the path does not exist or is not a directory.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(path.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// Canonical path of the root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Decode and lexically normalize a URL path into a root-relative path.
    ///
    /// `.` and empty segments are dropped, `..` pops the previous segment.
    /// A `..` with nothing left to pop would leave the root, which is an
    /// [`ServeError::InvalidPath`]. So are paths that fail percent-decoding
    /// or contain NUL bytes or backslashes.
    pub fn normalize(request_path: &str) -> Result<PathBuf, ServeError> {
        let invalid = || ServeError::InvalidPath {
            path: request_path.to_string(),
        };

        let decoded = urlencoding::decode(request_path).map_err(|_| invalid())?;
        if decoded.contains('\0') {
            return Err(invalid());
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(invalid());
                    }
                }
                s if s.contains('\\') => return Err(invalid()),
                s => segments.push(s),
            }
        }

        Ok(segments.iter().collect())
    }

    /// Resolve a request path to a resource under the root.
    ///
    /// # Errors
    ///
    /// - [`ServeError::InvalidPath`] if the path escapes the root, lexically
    ///   or through a symlink
    /// - [`ServeError::NotFound`] if nothing exists at the path, or it is
    ///   neither a regular file nor a directory
    /// - [`ServeError::Io`] for any other stat failure
    pub async fn resolve(&self, request_path: &str) -> Result<Resource, ServeError> {
        let relative = Self::normalize(request_path)?;
        let joined = self.root.join(&relative);

        let canonical = tokio::fs::canonicalize(&joined)
            .await
            .map_err(|e| ServeError::from_io(request_path, e))?;

        if !canonical.starts_with(&self.root) {
            warn!(
                path = request_path,
                target = %canonical.display(),
                "Symlink escapes root directory"
            );
            return Err(ServeError::InvalidPath {
                path: request_path.to_string(),
            });
        }

        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|e| ServeError::from_io(request_path, e))?;

        let kind = if metadata.is_dir() {
            ResourceKind::Directory
        } else if metadata.is_file() && !request_path.ends_with('/') {
            ResourceKind::File {
                size: metadata.len(),
                modified: metadata.modified().ok(),
            }
        } else {
            // Sockets, FIFOs and device nodes are never served; neither is a
            // file addressed with a trailing slash
            return Err(ServeError::NotFound {
                path: request_path.to_string(),
            });
        };

        Ok(Resource {
            path: canonical,
            relative,
            kind,
        })
    }
}
