//! Request-scoped object cache
//!
//! A capacity-bounded, TTL-aware cache for derived data (aggregates,
//! resolved settings). It exists for performance only: correctness
//! must never depend on it, and every entry can be rebuilt from the
//! store at any time. Oldest entries are evicted first on overflow;
//! expired entries are pruned whenever the cache is touched.

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// One cached value with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// The cached value.
    pub value: Value,
    /// Expiry as a Unix timestamp.
    pub ttl: i64,
}

/// Capacity-bounded TTL cache.
///
/// # Examples
///
/// ```
/// use warden_access::cache::ObjectCache;
/// use serde_json::json;
///
/// let mut cache = ObjectCache::new(2);
/// cache.set("a", json!(1), 60);
/// cache.set("b", json!(2), 60);
/// cache.set("c", json!(3), 60); // evicts "a"
///
/// assert!(cache.get("a").is_none());
/// assert_eq!(cache.get("c"), Some(json!(3)));
/// ```
#[derive(Debug, Clone)]
pub struct ObjectCache {
    capacity: usize,
    entries: IndexMap<String, CacheEntry>,
}

impl ObjectCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: IndexMap::new() }
    }

    /// Read a value, pruning expired entries first.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.prune(Utc::now().timestamp());
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value for `ttl_seconds`, evicting the oldest entry on
    /// overflow.
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl_seconds: i64) {
        let now = Utc::now().timestamp();
        self.prune(now);
        let key = key.into();
        self.entries.shift_remove(&key);
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                trace!(key = %evicted, "cache capacity eviction");
            }
        }
        self.entries.insert(key, CacheEntry { value, ttl: now + ttl_seconds });
    }

    /// Remove one entry.
    pub fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no entry is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild from a persisted blob, dropping expired entries.
    pub fn from_entries(capacity: usize, entries: IndexMap<String, CacheEntry>) -> Self {
        let mut cache = Self { capacity: capacity.max(1), entries };
        cache.prune(Utc::now().timestamp());
        while cache.entries.len() > cache.capacity {
            cache.entries.shift_remove_index(0);
        }
        cache
    }

    /// The persistable entry map.
    pub fn entries(&self) -> &IndexMap<String, CacheEntry> {
        &self.entries
    }

    fn prune(&mut self, now: i64) {
        self.entries.retain(|_, entry| entry.ttl > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_set_remove() {
        let mut cache = ObjectCache::new(8);
        cache.set("k", json!({"a": 1}), 60);
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));

        cache.remove("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_expired_entries_are_pruned_on_load() {
        let mut entries = IndexMap::new();
        let now = Utc::now().timestamp();
        entries.insert("dead".to_string(), CacheEntry { value: json!(1), ttl: now - 10 });
        entries.insert("live".to_string(), CacheEntry { value: json!(2), ttl: now + 60 });

        let mut cache = ObjectCache::from_entries(8, entries);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("live"), Some(json!(2)));
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut cache = ObjectCache::new(2);
        cache.set("first", json!(1), 60);
        cache.set("second", json!(2), 60);
        cache.set("third", json!(3), 60);

        assert!(cache.get("first").is_none());
        assert_eq!(cache.get("second"), Some(json!(2)));
        assert_eq!(cache.get("third"), Some(json!(3)));
    }

    #[test]
    fn test_overwrite_refreshes_position() {
        let mut cache = ObjectCache::new(2);
        cache.set("a", json!(1), 60);
        cache.set("b", json!(2), 60);
        cache.set("a", json!(10), 60);
        cache.set("c", json!(3), 60); // evicts "b", the oldest now

        assert_eq!(cache.get("a"), Some(json!(10)));
        assert!(cache.get("b").is_none());
    }
}
