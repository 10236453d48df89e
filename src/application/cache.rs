//! Response Cache
//!
//! Short-TTL key → (value, inserted_at) map. No eviction task: entries are
//! treated as expired on read and purged when the map reaches capacity.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// Check if entry is still valid
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

#[derive(Debug)]
pub struct ResponseCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> ResponseCache<K, V> {
    /// Default max cache entries
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Get a cached value if still valid
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_valid(self.ttl))
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.cleanup();
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.remove_oldest();
        }
        self.entries.insert(key, CacheEntry::new(value));
    }

    /// Remove all expired entries
    pub fn cleanup(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_valid(ttl));
    }

    fn remove_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
