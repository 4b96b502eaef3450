//! Error types for Rejoin Core
//!
//! Provides error handling for:
//! - Store failures (propagated, record left as it was)
//! - Profile edits the platform refused
//! - Lock starvation
//! - Configuration loading

use rejoin_locks::LockError;
use rejoin_store::StoreError;
use rejoin_types::MemberId;
use std::path::PathBuf;

/// Main handler error type
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Store read, write or delete failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Member lock could not be acquired in time
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Platform refused the restoring profile edit; record kept
    #[error("profile edit for member {member} rejected: {source}")]
    ProfileEditRejected {
        member: MemberId,
        #[source]
        source: PlatformError,
    },
}

impl PersistError {
    /// Whether a later duplicate event could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::ProfileEditRejected { source, .. } => source.is_transient(),
            Self::Lock(_) => false,
        }
    }

    /// Operational condition that should alert rather than retry
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Lock(LockError::Starvation { .. }))
    }
}

/// Errors from the community platform client
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    /// Edit refused (missing permission, role hierarchy, unknown member)
    #[error("rejected: {reason}")]
    Rejected { reason: String },

    /// Rate limit hit
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Platform could not be reached
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// Create rejection with reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether the same edit could succeed later
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unavailable(_))
    }
}

/// Errors loading service configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid YAML
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid TOML
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// File extension maps to no known format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn persist_error_display() {
        let err = PersistError::ProfileEditRejected {
            member: MemberId::from("42"),
            source: PlatformError::rejected("missing permissions"),
        };
        assert_eq!(
            err.to_string(),
            "profile edit for member 42 rejected: rejected: missing permissions"
        );
    }

    #[test]
    fn persist_error_is_retryable() {
        assert!(PersistError::Store(StoreError::Unavailable("db".into())).is_retryable());
        assert!(PersistError::ProfileEditRejected {
            member: MemberId::from("1"),
            source: PlatformError::RateLimited { retry_after_ms: 500 },
        }
        .is_retryable());
        assert!(!PersistError::ProfileEditRejected {
            member: MemberId::from("1"),
            source: PlatformError::rejected("nope"),
        }
        .is_retryable());
    }

    #[test]
    fn starvation_is_fatal() {
        let err = PersistError::from(LockError::Starvation {
            key: "member-roles-1".into(),
            waited: Duration::from_secs(30),
        });
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
        assert!(!PersistError::Store(StoreError::Unavailable("db".into())).is_fatal());
    }
}
