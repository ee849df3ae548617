//! HTTP Cache Module
//!
//! Stores response payloads together with their conditional-request
//! validators (ETag, Last-Modified, extra headers).

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::CacheEntry;
use crate::clock::SharedClock;
use crate::config::CacheConfig;

// == HTTP Cache Entry ==
/// A cache entry carrying the validators needed for a conditional request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCacheEntry<V> {
    pub entry: CacheEntry<V>,
    /// Opaque validator from the `ETag` response header
    pub etag: Option<String>,
    /// Raw `Last-Modified` response header
    pub last_modified: Option<String>,
    /// Any other response headers worth keeping
    pub headers: HashMap<String, String>,
}

impl<V> HttpCacheEntry<V> {
    pub fn value(&self) -> &V {
        &self.entry.value
    }

    /// Maps the stored value while keeping every validator.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> HttpCacheEntry<U> {
        HttpCacheEntry {
            entry: self.entry.map(f),
            etag: self.etag,
            last_modified: self.last_modified,
            headers: self.headers,
        }
    }
}

/// Validators supplied alongside a payload on `set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub headers: HashMap<String, String>,
}

impl Validators {
    /// Creates an empty validator set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ETag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the Last-Modified value.
    pub fn with_last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = Some(last_modified.into());
        self
    }

    /// Adds one response header kept with the entry.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// == HTTP Cache ==
/// Validator-aware store.
///
/// Follows the same lazy expiry rule as the memory cache but keeps no
/// statistics and never evicts: it grows until entries expire and are read,
/// or until `clear`.
#[derive(Debug)]
pub struct HttpCache<V> {
    entries: HashMap<String, HttpCacheEntry<V>>,
    config: CacheConfig,
    clock: SharedClock,
}

impl<V: Clone> HttpCache<V> {
    // == Constructor ==
    /// Creates an empty HTTP cache. Only `default_ttl` is read from `config`.
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            clock,
        }
    }

    /// Returns the live entry for `key`, removing it if it has expired.
    pub fn get(&mut self, key: &str) -> Option<HttpCacheEntry<V>> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(found) if !found.entry.is_expired(now) => Some(found.clone()),
            Some(_) => {
                self.entries.remove(key);
                debug!(key, "http cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Stores a payload with its validators.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: V,
        validators: Validators,
        ttl: Option<Duration>,
    ) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let entry = CacheEntry::new(key.clone(), value, self.clock.now_ms(), ttl);

        debug!(
            key = %key,
            etag = validators.etag.as_deref().unwrap_or("-"),
            "http cache set"
        );
        self.entries.insert(
            key,
            HttpCacheEntry {
                entry,
                etag: validators.etag,
                last_modified: validators.last_modified,
                headers: validators.headers,
            },
        );
    }

    /// Whether `key` holds a live entry whose ETag matches `etag`.
    ///
    /// With no `etag` argument only presence and TTL are checked. Reading an
    /// expired entry here does not remove it.
    pub fn is_valid(&self, key: &str, etag: Option<&str>) -> bool {
        let now = self.clock.now_ms();
        let Some(found) = self.entries.get(key) else {
            return false;
        };
        if found.entry.is_expired(now) {
            return false;
        }
        match etag {
            Some(expected) => found.etag.as_deref() == Some(expected),
            None => true,
        }
    }

    /// Remaining lifetime of a live entry in milliseconds.
    ///
    /// `None` when the key is absent or already expired.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|found| !found.entry.is_expired(now))
            .map(|found| found.entry.ttl_remaining_ms(now))
    }

    /// Removes an entry by key. Returns true if one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
