//! Distributed mutual exclusion over the key-value boundary.

use crate::error::{CoreError, CoreResult};
use sieva_storage::KeyValueStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// A held lock: the key plus the single-use value that proves ownership.
///
/// Only the holder of the issued value may release the key; a lock that
/// expired and was re-acquired by someone else compares unequal and is
/// left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    key: String,
    value: String,
}

impl LockToken {
    /// Returns the locked key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Poll-based distributed lock manager.
///
/// Acquisition claims the key with `set_if_absent` and, on contention,
/// sleeps for the configured poll interval until the caller's timeout
/// elapses. The wait is always bounded: a lock that cannot be acquired
/// in time fails fast with [`CoreError::Busy`] rather than blocking
/// indefinitely. The entry's TTL bounds the damage of a crashed holder.
pub struct LockManager {
    kv: Arc<dyn KeyValueStore>,
    poll_interval: Duration,
    ttl: Duration,
}

impl LockManager {
    /// Creates a lock manager over a key-value store.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, poll_interval: Duration, ttl: Duration) -> Self {
        Self {
            kv,
            poll_interval,
            ttl,
        }
    }

    /// Formats the lock key for one entity row.
    #[must_use]
    pub fn entity_key(collection: &str, id: u64) -> String {
        format!("lock:{collection}:{id}")
    }

    /// Acquires the lock, polling until success or timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Busy`] if the lock is still held when the
    /// timeout elapses.
    pub fn acquire(&self, key: &str, timeout: Duration) -> CoreResult<LockToken> {
        let value = Uuid::new_v4().to_string();
        let deadline = Instant::now() + timeout;

        loop {
            if self.kv.set_if_absent(key, &value, self.ttl)? {
                return Ok(LockToken {
                    key: key.to_string(),
                    value,
                });
            }
            if Instant::now() >= deadline {
                debug!(key, "lock acquisition timed out");
                return Err(CoreError::busy(key));
            }
            // Yields the scheduler; this is a sleep, not a spin.
            std::thread::sleep(self.poll_interval.min(deadline - Instant::now()));
        }
    }

    /// Releases the lock if the stored value still matches the token.
    ///
    /// A mismatch means the entry expired and was acquired by another
    /// holder; releasing it would steal their lock, so the entry is left
    /// untouched.
    pub fn release(&self, token: &LockToken) -> CoreResult<()> {
        match self.kv.get(&token.key)? {
            Some(stored) if stored == token.value => {
                self.kv.remove(&token.key)?;
            }
            _ => {
                debug!(key = %token.key, "skipping release of a lock held by someone else");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("poll_interval", &self.poll_interval)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieva_storage::MemoryKvStore;
    use std::thread;

    fn manager() -> LockManager {
        LockManager::new(
            Arc::new(MemoryKvStore::new()),
            Duration::from_millis(5),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn acquire_and_release() {
        let locks = manager();
        let token = locks.acquire("lock:a", Duration::from_millis(50)).unwrap();
        locks.release(&token).unwrap();
        // Released, so immediately acquirable again.
        locks.acquire("lock:a", Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn contended_acquire_times_out_busy() {
        let locks = manager();
        let _held = locks.acquire("lock:a", Duration::from_millis(50)).unwrap();
        let err = locks
            .acquire("lock:a", Duration::from_millis(40))
            .unwrap_err();
        assert!(matches!(err, CoreError::Busy { .. }));
    }

    #[test]
    fn acquire_succeeds_after_release() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
        let locks = Arc::new(LockManager::new(
            Arc::clone(&kv),
            Duration::from_millis(5),
            Duration::from_secs(30),
        ));

        let token = locks.acquire("lock:a", Duration::from_millis(50)).unwrap();

        let locks2 = Arc::clone(&locks);
        let waiter = thread::spawn(move || locks2.acquire("lock:a", Duration::from_secs(2)));

        thread::sleep(Duration::from_millis(30));
        locks.release(&token).unwrap();

        waiter.join().unwrap().unwrap();
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let locks = Arc::new(manager());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            handles.push(thread::spawn(move || {
                locks.acquire("lock:a", Duration::from_millis(20))
            }));
        }
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let acquired = outcomes.iter().filter(|r| r.is_ok()).count();
        // Nobody releases, so exactly one acquisition can have succeeded.
        assert_eq!(acquired, 1);
    }

    #[test]
    fn release_only_deletes_own_value() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
        // Short TTL so the first holder's entry expires underneath it.
        let locks = LockManager::new(Arc::clone(&kv), Duration::from_millis(5), Duration::from_millis(10));

        let stale = locks.acquire("lock:a", Duration::from_millis(50)).unwrap();
        thread::sleep(Duration::from_millis(30));

        // A second holder acquires after expiry.
        let fresh = locks.acquire("lock:a", Duration::from_millis(50)).unwrap();

        // The stale token must not release the fresh holder's lock.
        locks.release(&stale).unwrap();
        assert!(kv.get("lock:a").unwrap().is_some());

        locks.release(&fresh).unwrap();
        assert!(kv.get("lock:a").unwrap().is_none());
    }

    #[test]
    fn entity_key_format() {
        assert_eq!(LockManager::entity_key("orders", 42), "lock:orders:42");
    }
}
