//! Generic TTL cache with lazy expiry
//!
//! A thread-safe map whose entries become invisible once their TTL has
//! elapsed. Expired entries are dropped on the next lookup that touches
//! them, not by a background sweep. The clock is injectable so expiry
//! can be tested without real time passing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::testing::{Clock, SystemClock};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe TTL cache.
///
/// # Type Parameters
/// - `K`: key type (`Eq + Hash + Clone`)
/// - `V`: value type (`Clone`; share expensive values behind an `Arc`)
/// - `C`: clock, defaults to [`SystemClock`]
pub struct TtlCache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
    ttl: Duration,
    clock: C,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl`, using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a cache with a custom clock (useful for testing).
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), ttl, clock }
    }

    /// Insert a value, replacing any previous entry for the key and
    /// restarting its TTL window.
    pub fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, Entry { value, expires_at });
    }

    /// Look up a value. Returns `None` for missing keys and for entries
    /// past their expiry, evicting the latter.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(key) {
            Some(entry) if now <= entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                debug!("evicting expired cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove an entry regardless of its expiry state.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Number of entries currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Whether the cache holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, C> Clone for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), ttl: self.ttl, clock: self.clock.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClock;

    #[test]
    fn returns_inserted_value_within_ttl() {
        let clock = MockClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.insert("key".to_string(), 42);
        clock.advance(Duration::from_secs(59));

        assert_eq!(cache.get(&"key".to_string()), Some(42));
    }

    #[test]
    fn expires_entries_lazily() {
        let clock = MockClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.insert("key".to_string(), 42);
        clock.advance(Duration::from_secs(61));

        // Still stored until the lookup evicts it.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"key".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn keys_are_isolated() {
        let clock = MockClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), Some(2));

        cache.remove(&"a".to_string());
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), Some(2));
    }

    #[test]
    fn reinsert_restarts_ttl() {
        let clock = MockClock::new();
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.insert("key".to_string(), 1);
        clock.advance(Duration::from_secs(45));
        cache.insert("key".to_string(), 2);
        clock.advance(Duration::from_secs(45));

        assert_eq!(cache.get(&"key".to_string()), Some(2));
    }

    #[test]
    fn clones_share_storage() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        let cloned = cache.clone();

        cache.insert("key".to_string(), 7);
        assert_eq!(cloned.get(&"key".to_string()), Some(7));
    }
}
