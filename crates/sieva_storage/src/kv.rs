//! Opaque key-value store boundary with TTL semantics.

use crate::error::StorageResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A TTL'd key-value slot store.
///
/// Used by the engine for two concerns it does not own the persistence
/// of: export-job status records and distributed lock entries. The
/// engine only decides the key format; lifetime and eviction belong to
/// the backing store (a cache service in production deployments).
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if present and unexpired.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()>;

    /// Stores `value` under `key` only if the key is absent (or expired).
    ///
    /// Returns `true` if the value was stored. This is the primitive the
    /// distributed lock and the export-code collision check build on.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool>;

    /// Removes the key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-memory key-value store with lazy expiry.
///
/// Entries are checked against their deadline on access rather than
/// evicted actively; that is sufficient for the engine contract, which
/// never depends on eviction timing.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryKvStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of unexpired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    /// Returns `true` if no unexpired entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some((_, deadline)) if *deadline > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), (value.to_string(), now + ttl));
                Ok(true)
            }
        }
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn set_and_get() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1", TTL).unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(kv.get("b").unwrap(), None);
    }

    #[test]
    fn set_if_absent_respects_existing() {
        let kv = MemoryKvStore::new();
        assert!(kv.set_if_absent("a", "1", TTL).unwrap());
        assert!(!kv.set_if_absent("a", "2", TTL).unwrap());
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn set_overwrites() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1", TTL).unwrap();
        kv.set("a", "2", TTL).unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn remove_is_idempotent() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1", TTL).unwrap();
        kv.remove("a").unwrap();
        kv.remove("a").unwrap();
        assert_eq!(kv.get("a").unwrap(), None);
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(kv.get("a").unwrap(), None);
        // And the slot becomes claimable again.
        assert!(kv.set_if_absent("a", "2", TTL).unwrap());
    }
}
