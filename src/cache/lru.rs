//! LRU cache for table handles.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Statistics for cache operations.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: AtomicU64,
    /// Number of cache misses.
    pub misses: AtomicU64,
    /// Number of evictions.
    pub evictions: AtomicU64,
}

impl CacheStats {
    /// Get hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

struct LruInner<K, V> {
    map: HashMap<K, V>,
    // Access order, least recently used first. Table-handle caches hold at
    // most a few thousand entries, so a vector scan on touch is fine.
    order: Vec<K>,
}

/// A mutex-guarded LRU cache.
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<LruInner<K, V>>,
    stats: Arc<CacheStats>,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LruInner {
                map: HashMap::new(),
                order: Vec::new(),
            }),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Look up a key, promoting it to most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        if let Some(value) = inner.map.get(key).cloned() {
            let pos = inner.order.iter().position(|k| k == key);
            if let Some(pos) = pos {
                let k = inner.order.remove(pos);
                inner.order.push(k);
            }
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            Some(value)
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a value, evicting the least recently used entry if full.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        if inner.map.insert(key.clone(), value).is_some() {
            let pos = inner.order.iter().position(|k| k == &key);
            if let Some(pos) = pos {
                inner.order.remove(pos);
            }
        } else if inner.map.len() > self.capacity {
            if !inner.order.is_empty() {
                let evicted = inner.order.remove(0);
                inner.map.remove(&evicted);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        inner.order.push(key);
    }

    /// Remove an entry.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.map.remove(key);
        if value.is_some() {
            let pos = inner.order.iter().position(|k| k == key);
            if let Some(pos) = pos {
                inner.order.remove(pos);
            }
        }
        value
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache statistics.
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Drop all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_get_insert() {
        let cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");

        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction_order() {
        let cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");

        // Touch 1 so 2 becomes the LRU entry.
        cache.get(&1);
        cache.insert(3, "c");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), Some("c"));
        assert_eq!(cache.stats().evictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_remove() {
        let cache = LruCache::new(4);
        cache.insert(1, "a");
        assert_eq!(cache.remove(&1), Some("a"));
        assert_eq!(cache.remove(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_updates() {
        let cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(1, "b");
        assert_eq!(cache.get(&1), Some("b"));
        assert_eq!(cache.len(), 1);
    }
}
