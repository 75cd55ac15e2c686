//! Checklist definition cache (§5, §9).
//!
//! A process-wide, read-through cache for parsed checklist definition
//! documents. Eviction is by TTL; writes are idempotent overwrites. Cache
//! failure never blocks a request — callers fall back to reading the
//! underlying file and simply skip the write-through on failure.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A TTL-based in-memory cache keyed by string (typically a checklist file
/// path). Thread-safe via an internal mutex; reads and writes are cheap
/// enough that lock contention is not a concern at this scale.
pub struct TtlCache<V: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Read-through `get`: returns `Some(value)` only if present and not
    /// expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Idempotent overwrite.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let key = key.into();
        debug!(key, "checklist cache write");
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_through_until_expiry() {
        let cache: TtlCache<u32> = TtlCache::new(0);
        cache.set("a", 1);
        // TTL of 0 means every read is already expired.
        assert_eq!(cache.get("a"), None);

        let cache: TtlCache<u32> = TtlCache::new(3600);
        cache.set("b", 42);
        assert_eq!(cache.get("b"), Some(42));
    }

    #[test]
    fn overwrite_is_idempotent() {
        let cache: TtlCache<u32> = TtlCache::new(3600);
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
