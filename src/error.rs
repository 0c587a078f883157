// Error types for ldcache
use camino::Utf8PathBuf;
use std::io;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cache file not found: {path}")]
    NotFound { path: Utf8PathBuf },

    #[error("Invalid ld.so.cache file: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidFormat(reason.into())
    }
}
