//! Cache Facade
//!
//! One handle over the memory cache and the HTTP cache. Clones share the
//! same stores, so a single `Cache` built at startup is handed to every
//! consumer instead of living in a global.

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::cache::{
    CacheStats, HttpCache, HttpCacheEntry, InvalidateOptions, MemoryCache, Validators,
};
use crate::clock::{SharedClock, SystemClock};
use crate::config::CacheConfig;

/// Type-erased value as held by the facade's stores.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

// == Cache Facade ==
/// Shared entry point for both backing stores.
///
/// Store locks are never held across an `.await`; only fetchers suspend.
#[derive(Clone, Debug)]
pub struct Cache {
    memory: Arc<Mutex<MemoryCache<CachedValue>>>,
    http: Arc<Mutex<HttpCache<CachedValue>>>,
    config: CacheConfig,
    clock: SharedClock,
}

impl Cache {
    // == Constructors ==
    /// Creates a cache reading wall-clock time.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    ///
    /// Both stores receive their own copy of `config`.
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            memory: Arc::new(Mutex::new(MemoryCache::new(config.clone(), clock.clone()))),
            http: Arc::new(Mutex::new(HttpCache::new(config.clone(), clock.clone()))),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    // == Memory Cache ==
    /// Typed read from the memory cache.
    ///
    /// A value stored under a different type reads as `None`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.memory().get(key)?;
        downcast(key, &value)
    }

    /// Stores a value in the memory cache; `ttl` falls back to the default.
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        self.memory().set(key, Arc::new(value) as CachedValue, ttl);
    }

    /// Removes a memory entry. Returns true if one existed.
    pub fn delete(&self, key: &str) -> bool {
        self.memory().delete(key)
    }

    /// Drops every memory entry. Cumulative counters are kept.
    pub fn clear(&self) {
        self.memory().clear();
    }

    /// Removes the memory entries matched by `opts`. Returns the count.
    pub fn invalidate(&self, opts: &InvalidateOptions) -> usize {
        self.memory().invalidate(opts)
    }

    /// Memory cache statistics. The HTTP cache keeps none.
    pub fn stats(&self) -> CacheStats {
        self.memory().stats()
    }

    /// Whether the memory cache holds a live entry, without counting a lookup.
    pub fn has(&self, key: &str) -> bool {
        self.memory().contains(key)
    }

    /// Memory cache keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.memory().keys();
        keys.sort();
        keys
    }

    // == HTTP Cache ==
    /// Typed read of a live HTTP entry together with its validators.
    pub fn get_http<T>(&self, key: &str) -> Option<HttpCacheEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let found = self.http().get(key)?;
        let value = downcast::<T>(key, &found.entry.value)?;
        Some(found.map(|_| value))
    }

    /// Stores a payload with its ETag / Last-Modified validators.
    pub fn set_http<T>(
        &self,
        key: impl Into<String>,
        value: T,
        validators: Validators,
        ttl: Option<Duration>,
    ) where
        T: Send + Sync + 'static,
    {
        self.http()
            .set(key, Arc::new(value) as CachedValue, validators, ttl);
    }

    /// Whether a live HTTP entry exists and, if given, carries `etag`.
    pub fn is_http_valid(&self, key: &str, etag: Option<&str>) -> bool {
        self.http().is_valid(key, etag)
    }

    /// Remaining lifetime of a live HTTP entry in milliseconds.
    pub fn http_ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        self.http().ttl_remaining_ms(key)
    }

    pub fn delete_http(&self, key: &str) -> bool {
        self.http().delete(key)
    }

    pub fn clear_http(&self) {
        self.http().clear();
    }

    pub fn http_len(&self) -> usize {
        self.http().len()
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, or awaits `fetcher` and caches
    /// its result.
    ///
    /// Concurrent misses on one key each run their fetcher and the last
    /// write wins. Fetcher errors are returned untouched.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Option<Duration>,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }

        debug!(key, "fetching on cache miss");
        let value = fetcher().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    // == Prefetch ==
    /// Fetches and caches every key that has no live entry.
    ///
    /// All fetches run concurrently. The first failure is returned and the
    /// fetches still in flight are dropped without being stored.
    pub async fn prefetch<T, E, F, Fut, I, K>(&self, keys: I, fetcher: F) -> Result<(), E>
    where
        T: Send + Sync + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let fetcher = &fetcher;
        let pending: Vec<_> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key: &String| self.memory().get(key).is_none())
            .map(|key| async move {
                let value = fetcher(key.clone()).await?;
                self.set(key, value, None);
                Ok::<(), E>(())
            })
            .collect();

        debug!(count = pending.len(), "prefetching keys");
        try_join_all(pending).await?;
        Ok(())
    }

    fn memory(&self) -> MutexGuard<'_, MemoryCache<CachedValue>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn http(&self) -> MutexGuard<'_, HttpCache<CachedValue>> {
        self.http.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn downcast<T: Clone + 'static>(key: &str, value: &CachedValue) -> Option<T> {
    let typed = (**value).downcast_ref::<T>().cloned();
    if typed.is_none() {
        warn!(key, expected = std::any::type_name::<T>(), "cached value has a different type");
    }
    typed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Cache, Arc<ManualClock>) {
        let clock = ManualClock::shared(1_000);
        (Cache::with_clock(CacheConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_typed_round_trip() {
        let (cache, _) = cache();
        cache.set("trainer:1", vec!["yoga".to_string()], None);

        assert_eq!(cache.get::<Vec<String>>("trainer:1"), Some(vec!["yoga".to_string()]));
    }

    #[test]
    fn test_type_mismatch_reads_as_none() {
        let (cache, _) = cache();
        cache.set("n", 5u32, None);
        assert_eq!(cache.get::<String>("n"), None);
        assert_eq!(cache.get::<u32>("n"), Some(5));
    }

    #[test]
    fn test_clones_share_stores() {
        let (cache, _) = cache();
        let other = cache.clone();
        other.set("k", 1i32, None);
        assert_eq!(cache.get::<i32>("k"), Some(1));
    }

    #[test]
    fn test_http_round_trip() {
        let (cache, clock) = cache();
        cache.set_http(
            "/reviews",
            "[]".to_string(),
            Validators::new().with_etag("abc"),
            Some(Duration::from_millis(100)),
        );

        let entry = cache.get_http::<String>("/reviews").unwrap();
        assert_eq!(entry.value(), "[]");
        assert!(cache.is_http_valid("/reviews", Some("abc")));
        assert!(!cache.is_http_valid("/reviews", Some("def")));

        clock.advance(Duration::from_millis(150));
        assert!(!cache.is_http_valid("/reviews", Some("abc")));
        assert!(cache.get_http::<String>("/reviews").is_none());
    }

    #[test]
    fn test_stats_ignore_http_store() {
        let (cache, _) = cache();
        cache.set_http("k", 1u8, Validators::new(), None);
        cache.get_http::<u8>("k");
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.http_len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_skips_fetcher_on_hit() {
        let (cache, _) = cache();
        cache.set("k", 7u32, None);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let value = cache
            .get_or_fetch(
                "k",
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(9u32)
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_or_fetch_fetches_once_on_cold_key() {
        let (cache, _) = cache();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("fresh".to_string())
        };

        assert_eq!(cache.get_or_fetch("k", fetch, None).await.unwrap(), "fresh");
        assert_eq!(cache.get_or_fetch("k", fetch, None).await.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_error_without_storing() {
        let (cache, _) = cache();
        let result: Result<u8, _> = cache
            .get_or_fetch("k", || async { Err(anyhow!("backend down")) }, None)
            .await;

        assert_eq!(result.unwrap_err().to_string(), "backend down");
        assert!(!cache.has("k"));
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_fetch_last_write_wins() {
        // No single-flight on the facade path
        let (cache, _) = cache();
        let (started_tx, mut started_rx) = tokio::sync::mpsc::unbounded_channel();
        let gated = |n: u32, release: tokio::sync::oneshot::Receiver<()>| {
            let started = started_tx.clone();
            move || async move {
                let _ = started.send(n);
                let _ = release.await;
                Ok::<_, anyhow::Error>(n)
            }
        };
        let (release_a, gate_a) = tokio::sync::oneshot::channel();
        let (release_b, gate_b) = tokio::sync::oneshot::channel();

        let a = tokio::spawn({
            let cache = cache.clone();
            let fetch = gated(1, gate_a);
            async move { cache.get_or_fetch("k", fetch, None).await }
        });
        let b = tokio::spawn({
            let cache = cache.clone();
            let fetch = gated(2, gate_b);
            async move { cache.get_or_fetch("k", fetch, None).await }
        });

        // Both missed before either stored
        started_rx.recv().await.unwrap();
        started_rx.recv().await.unwrap();

        release_a.send(()).unwrap();
        assert_eq!(a.await.unwrap().unwrap(), 1);
        assert_eq!(cache.get::<u32>("k"), Some(1));

        release_b.send(()).unwrap();
        assert_eq!(b.await.unwrap().unwrap(), 2);
        assert_eq!(cache.get::<u32>("k"), Some(2));
    }

    #[tokio::test]
    async fn test_prefetch_only_missing_keys() {
        let (cache, _) = cache();
        cache.set("a", "cached".to_string(), None);
        let calls = AtomicUsize::new(0);

        cache
            .prefetch(["a", "b", "c"], |key| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, anyhow::Error>(format!("fetched {key}")) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<String>("a").as_deref(), Some("cached"));
        assert_eq!(cache.get::<String>("c").as_deref(), Some("fetched c"));
    }

    #[tokio::test]
    async fn test_prefetch_propagates_first_failure() {
        let (cache, _) = cache();

        let result = cache
            .prefetch(["ok", "bad"], |key| async move {
                if key == "bad" {
                    Err(anyhow!("no such trainer"))
                } else {
                    Ok(1u8)
                }
            })
            .await;

        assert!(result.is_err());
    }
}
