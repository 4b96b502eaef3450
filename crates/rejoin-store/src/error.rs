//! Store errors

use std::path::PathBuf;

/// Errors from state and allow-list repositories
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// IO error on a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same operation later may succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io { .. })
    }
}
