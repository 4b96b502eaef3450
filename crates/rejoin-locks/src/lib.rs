//! Rejoin Locks
//!
//! Per-key mutual exclusion for async handlers. Each key gets its own
//! FIFO mutex on demand; entries disappear once released with no waiters.
//!
//! # Example
//!
//! ```rust,ignore
//! use rejoin_locks::KeyedLockManager;
//!
//! # async fn example() -> Result<(), rejoin_locks::LockError> {
//! let locks = KeyedLockManager::new();
//! let lock = locks.acquire("member-roles-1234").await?;
//! // critical section
//! lock.release();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod manager;

pub use error::LockError;
pub use manager::{KeyedLockManager, LockOptions, MemberLock};
