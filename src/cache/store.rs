//! Memory Cache Module
//!
//! Bounded key-value store with lazy TTL expiry, oldest-entry eviction and
//! hit/miss statistics.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, InvalidateOptions};
use crate::clock::SharedClock;
use crate::config::CacheConfig;

/// An entry plus its insertion sequence, used to break timestamp ties.
#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    seq: u64,
}

// == Memory Cache ==
/// Main cache storage with size-bounded eviction and TTL support.
///
/// Expiry is enforced only when a key is touched; there is no background
/// sweeper, so `size` counts expired entries until they are read.
#[derive(Debug)]
pub struct MemoryCache<V> {
    /// Key-value storage
    entries: HashMap<String, Slot<V>>,
    /// Performance statistics
    stats: CacheStats,
    config: CacheConfig,
    clock: SharedClock,
    next_seq: u64,
}

impl<V: Clone> MemoryCache<V> {
    // == Constructor ==
    /// Creates an empty cache with its own copy of `config`.
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            config,
            clock,
            next_seq: 0,
        }
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(slot) if !slot.entry.is_expired(now) => {
                let value = slot.entry.value.clone();
                self.stats.record_hit();
                debug!(key, "memory cache hit");
                Some(value)
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.set_size(self.entries.len());
                self.stats.record_miss();
                debug!(key, "memory cache entry expired");
                None
            }
            None => {
                self.stats.record_miss();
                debug!(key, "memory cache miss");
                None
            }
        }
    }

    // == Set ==
    /// Stores a value, using the configured default TTL when `ttl` is None.
    ///
    /// Overwriting an existing key replaces its entry. Inserting a new key
    /// into a full cache first evicts the entry with the oldest timestamp.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.config.max_size {
            self.evict_oldest();
        }

        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let entry = CacheEntry::new(key.clone(), value, self.clock.now_ms(), ttl);
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(
            key = %key,
            ttl_ms = ttl.as_millis() as u64,
            overwrite = is_overwrite,
            "memory cache set"
        );
        self.entries.insert(key, Slot { entry, seq });
        self.stats.set_size(self.entries.len());
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.set_size(self.entries.len());
        }
        removed
    }

    // == Clear ==
    /// Drops every entry. Hit and miss counters keep accumulating.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats.set_size(0);
        info!(dropped, "memory cache cleared");
    }

    // == Invalidate ==
    /// Removes every entry matched by `opts`. Returns the number removed.
    pub fn invalidate(&mut self, opts: &InvalidateOptions) -> usize {
        if opts.is_empty() {
            return 0;
        }

        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !opts.matches(&slot.entry, now));
        let removed = before - self.entries.len();

        self.stats.set_size(self.entries.len());
        info!(removed, "memory cache invalidated");
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    /// Whether a live entry exists, without touching stats or expiry.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired(now))
    }

    /// Keys currently stored, including expired ones not yet touched.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| (slot.entry.timestamp, slot.seq))
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.record_eviction();
            debug!(key = %key, "memory cache evicted oldest entry");
        }
    }
}
