//! Lock acquisition errors

use std::time::Duration;

/// Errors from [`KeyedLockManager`](crate::KeyedLockManager)
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Acquire waited past the configured bound
    ///
    /// Usually means a prior holder is stuck. Treated as an operational
    /// alert, not something to retry inline.
    #[error("lock '{key}' not acquired after {}ms", waited.as_millis())]
    Starvation {
        /// Lock key
        key: String,
        /// Time spent waiting
        waited: Duration,
    },
}

impl LockError {
    /// Key the failed acquire was for
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Starvation { key, .. } => key,
        }
    }
}
