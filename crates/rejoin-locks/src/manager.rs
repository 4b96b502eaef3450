//! Keyed lock registry
//!
//! One async mutex per key, created on first acquire and pruned once the
//! last holder and waiter are gone. Unrelated keys never contend.

use crate::error::LockError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

type Registry = DashMap<String, Arc<Mutex<()>>>;

/// Bounds applied to [`KeyedLockManager::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Give up after this long; `None` waits forever
    pub acquire_timeout: Option<Duration>,
    /// Log a warning when a wait exceeds this
    pub warn_after: Duration,
}

impl LockOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With acquire timeout
    #[inline]
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// With warning threshold
    #[inline]
    #[must_use]
    pub fn with_warn_after(mut self, warn_after: Duration) -> Self {
        self.warn_after = warn_after;
        self
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            acquire_timeout: Some(Duration::from_secs(30)),
            warn_after: Duration::from_secs(5),
        }
    }
}

/// Process-wide registry of per-key locks
///
/// Cloning is cheap and shares the registry.
#[derive(Debug, Clone, Default)]
pub struct KeyedLockManager {
    locks: Arc<Registry>,
    options: LockOptions,
}

impl KeyedLockManager {
    /// Create manager with default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create manager with explicit options
    #[inline]
    #[must_use]
    pub fn with_options(options: LockOptions) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            options,
        }
    }

    /// Options in effect
    #[inline]
    #[must_use]
    pub fn options(&self) -> LockOptions {
        self.options
    }

    /// Wait until no one else holds `key`, then hold it
    ///
    /// Waiters are served in FIFO order.
    ///
    /// # Errors
    /// - `LockError::Starvation` if `acquire_timeout` elapses first
    pub async fn acquire(&self, key: impl Into<String>) -> Result<MemberLock, LockError> {
        let key = key.into();
        let mutex = Arc::clone(&*self.locks.entry(key.clone()).or_default());
        let started = Instant::now();

        let guard = match Arc::clone(&mutex).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(key = %key, "lock contended, waiting");
                let waited = self.wait(&key, mutex, started).await;
                match waited {
                    Ok(guard) => guard,
                    Err(err) => {
                        prune(&self.locks, &key);
                        return Err(err);
                    }
                }
            }
        };

        tracing::debug!(
            key = %key,
            waited_ms = started.elapsed().as_millis() as u64,
            "lock acquired"
        );

        Ok(MemberLock {
            key,
            guard: Some(guard),
            registry: Arc::clone(&self.locks),
            acquired_at: Instant::now(),
        })
    }

    async fn wait(
        &self,
        key: &str,
        mutex: Arc<Mutex<()>>,
        started: Instant,
    ) -> Result<OwnedMutexGuard<()>, LockError> {
        // Polled through both timeouts so the waiter keeps its queue slot
        let lock = mutex.lock_owned();
        tokio::pin!(lock);

        let warn_after = match self.options.acquire_timeout {
            Some(limit) => self.options.warn_after.min(limit),
            None => self.options.warn_after,
        };

        if let Ok(guard) = tokio::time::timeout(warn_after, &mut lock).await {
            return Ok(guard);
        }

        tracing::warn!(
            key = %key,
            waited_ms = started.elapsed().as_millis() as u64,
            "lock held unexpectedly long"
        );

        let Some(limit) = self.options.acquire_timeout else {
            return Ok(lock.await);
        };

        let remaining = limit.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, &mut lock).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                let waited = started.elapsed();
                tracing::error!(
                    key = %key,
                    waited_ms = waited.as_millis() as u64,
                    "lock starvation, prior holder may be stuck"
                );
                Err(LockError::Starvation {
                    key: key.to_string(),
                    waited,
                })
            }
        }
    }

    /// Whether `key` is currently held
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }

    /// Number of keys with a holder or waiter
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when no key is held or awaited
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock for one key
///
/// Released by [`MemberLock::release`] or when dropped, so early returns
/// and `?` paths unlock too.
#[derive(Debug)]
pub struct MemberLock {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<Registry>,
    acquired_at: Instant,
}

impl MemberLock {
    /// Key this lock holds
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// How long the lock has been held
    #[inline]
    #[must_use]
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Make the key available to the next waiter
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for MemberLock {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
            prune(&self.registry, &self.key);
            tracing::debug!(
                key = %self.key,
                held_ms = self.acquired_at.elapsed().as_millis() as u64,
                "lock released"
            );
        }
    }
}

/// Drop the entry when nothing but the registry references it
///
/// Runs under the shard lock, so a concurrent acquire either sees the old
/// entry with a raised count or inserts a fresh uncontended one.
fn prune(registry: &Registry, key: &str) {
    registry.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn acquire_and_release() {
        let locks = KeyedLockManager::new();

        let lock = locks.acquire("member-1").await.unwrap();
        assert_eq!(lock.key(), "member-1");
        assert!(locks.is_locked("member-1"));
        assert_eq!(locks.len(), 1);

        lock.release();
        assert!(!locks.is_locked("member-1"));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn drop_releases() {
        let locks = KeyedLockManager::new();

        {
            let _lock = locks.acquire("member-1").await.unwrap();
            assert!(locks.is_locked("member-1"));
        }

        assert!(locks.is_empty());
        let again = locks.acquire("member-1").await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyedLockManager::with_options(
            LockOptions::new().with_acquire_timeout(Some(Duration::from_millis(50))),
        );

        let _a = locks.acquire("a").await.unwrap();
        let b = locks.acquire("b").await;

        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_held() {
        let locks = KeyedLockManager::with_options(
            LockOptions::new()
                .with_acquire_timeout(Some(Duration::from_millis(100)))
                .with_warn_after(Duration::from_millis(10)),
        );

        let held = locks.acquire("a").await.unwrap();
        let result = locks.acquire("a").await;

        match result {
            Err(LockError::Starvation { key, waited }) => {
                assert_eq!(key, "a");
                assert!(waited >= Duration::from_millis(100));
            }
            other => panic!("expected starvation, got {other:?}"),
        }

        // Holder is unaffected and the entry survives for it
        assert!(locks.is_locked("a"));
        held.release();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiter_gets_lock_after_release() {
        let locks = KeyedLockManager::new();
        let held = locks.acquire("a").await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let lock = locks.acquire("a").await.unwrap();
                lock.key().to_string()
            })
        };

        tokio::task::yield_now().await;
        held.release();

        assert_eq!(waiter.await.unwrap(), "a");
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_mutually_exclusive() {
        let locks = KeyedLockManager::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let locks = locks.clone();
                let in_flight = Arc::clone(&in_flight);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let lock = locks.acquire("shared").await.unwrap();
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    lock.release();
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
