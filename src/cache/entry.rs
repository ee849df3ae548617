//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

// == Cache Entry ==
/// A stored value with its creation time and lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Lifetime measured from `timestamp`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped at `now_ms`.
    pub fn new(key: impl Into<String>, value: V, now_ms: u64, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp: now_ms,
            ttl,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was created.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL.
    ///
    /// An entry stays valid while `now - timestamp <= ttl`; it is expired
    /// from the first millisecond past that.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) > ttl_ms(self.ttl)
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        ttl_ms(self.ttl).saturating_sub(self.age_ms(now_ms))
    }

    /// Maps the stored value while keeping key, timestamp and TTL.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> CacheEntry<U> {
        CacheEntry {
            key: self.key,
            value: f(self.value),
            timestamp: self.timestamp,
            ttl: self.ttl,
        }
    }
}

fn ttl_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
