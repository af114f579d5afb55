//! In-memory result cache.
//!
//! Maps cache keys to the indices of matching rows. Entries expire after a
//! fixed TTL and, once the cache is over capacity, the oldest inserted entry
//! is evicted first.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Default maximum number of cached results.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    indices: Vec<usize>,
    inserted_at: Instant,
}

/// A bounded, TTL-checked cache of filter results.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: FxHashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
    max_entries: usize,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            max_entries,
            ttl,
        }
    }

    /// Returns the cached indices for `key` if present and not expired.
    ///
    /// Expired entries are removed on access.
    pub fn get(&mut self, key: &str) -> Option<Vec<usize>> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
        };

        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.indices.clone())
    }

    /// Inserts or replaces an entry, evicting the oldest ones when over capacity.
    pub fn insert(&mut self, key: impl Into<String>, indices: Vec<usize>) {
        let key = key.into();
        if self.max_entries == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                indices,
                inserted_at: Instant::now(),
            },
        );

        while self.entries.len() > self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<Vec<usize>> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry.indices)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = ResultCache::default();
        cache.insert("k", vec![1, 2, 3]);

        assert_eq!(cache.get("k"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = ResultCache::new(2, DEFAULT_TTL);
        cache.insert("a", vec![0]);
        cache.insert("b", vec![1]);
        // Reading does not refresh position.
        assert!(cache.get("a").is_some());
        cache.insert("c", vec![2]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(vec![1]));
        assert_eq!(cache.get("c"), Some(vec![2]));
    }

    #[test]
    fn test_reinsert_moves_entry_to_back() {
        let mut cache = ResultCache::new(2, DEFAULT_TTL);
        cache.insert("a", vec![0]);
        cache.insert("b", vec![1]);
        cache.insert("a", vec![9]);
        cache.insert("c", vec![2]);

        assert_eq!(cache.get("a"), Some(vec![9]));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let mut cache = ResultCache::new(10, Duration::from_millis(5));
        cache.insert("k", vec![1]);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = ResultCache::new(0, DEFAULT_TTL);
        cache.insert("k", vec![1]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = ResultCache::default();
        cache.insert("a", vec![]);
        cache.insert("b", vec![]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
