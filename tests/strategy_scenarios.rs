//! End-to-end scenarios through the public API
//!
//! Every test drives time through `ManualClock` or tokio's paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use fetch_cache::{
    fetcher, Cache, CacheConfig, Fetcher, InvalidateOptions, ManualClock, Query, QueryOptions,
    Swr, SwrOptions, Validators,
};

// == Helper Functions ==

fn setup(max_size: usize) -> (Cache, Arc<ManualClock>) {
    let clock = ManualClock::shared(1_000_000);
    let config = CacheConfig::default().with_max_size(max_size);
    (Cache::with_clock(config, clock.clone()), clock)
}

fn counting(calls: Arc<AtomicUsize>) -> Fetcher<String> {
    fetcher(move |key: String| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, anyhow::Error>(format!("{key}#{n}")) }
    })
}

// == Memory Cache ==

#[test]
fn scenario_eviction_drops_first_inserted_key() {
    let (cache, _) = setup(5);
    for i in 1..=6 {
        cache.set(format!("key{i}"), i, None);
    }

    assert_eq!(cache.get::<i32>("key1"), None);
    assert_eq!(cache.get::<i32>("key6"), Some(6));
    for i in 2..=5 {
        assert!(cache.has(&format!("key{i}")));
    }
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn scenario_expiry_counts_a_miss() {
    let (cache, clock) = setup(100);
    cache.set("k", "v".to_string(), Some(Duration::from_millis(500)));
    assert_eq!(cache.get::<String>("k").as_deref(), Some("v"));

    clock.advance(Duration::from_millis(501));
    let misses = cache.stats().misses;
    assert_eq!(cache.get::<String>("k"), None);
    assert_eq!(cache.stats().misses, misses + 1);
}

#[test]
fn scenario_pattern_invalidation_spares_unrelated_keys() {
    let (cache, _) = setup(100);
    cache.set("user:1", 1u8, None);
    cache.set("user:2", 2u8, None);
    cache.set("post:1", 3u8, None);
    cache.set("superuser:1", 4u8, None);

    let opts = InvalidateOptions::new().with_pattern("^user:").unwrap();
    assert_eq!(cache.invalidate(&opts), 2);
    assert_eq!(cache.keys(), vec!["post:1".to_string(), "superuser:1".to_string()]);
}

// == HTTP Cache ==

#[test]
fn scenario_http_entry_expires_and_turns_invalid() {
    let (cache, clock) = setup(100);
    cache.set_http(
        "/trainers",
        "payload".to_string(),
        Validators::new().with_etag("abc"),
        Some(Duration::from_millis(100)),
    );
    assert!(cache.is_http_valid("/trainers", Some("abc")));
    assert!(!cache.is_http_valid("/trainers", Some("xyz")));

    clock.advance(Duration::from_millis(150));
    assert!(!cache.is_http_valid("/trainers", Some("abc")));
    assert!(cache.get_http::<String>("/trainers").is_none());
}

// == Facade ==

#[tokio::test]
async fn scenario_get_or_fetch_calls_fetcher_once() {
    let (cache, _) = setup(100);
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let counter = &calls;
        let value = cache
            .get_or_fetch(
                "profile",
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>("me".to_string())
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, "me");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_get_or_fetch_propagates_errors_uncached() {
    let (cache, _) = setup(100);

    let result: Result<String, anyhow::Error> = cache
        .get_or_fetch("profile", || async { Err(anyhow!("offline")) }, None)
        .await;

    assert_eq!(result.unwrap_err().to_string(), "offline");
    assert!(!cache.has("profile"));
}

// == Query ==

#[tokio::test]
async fn scenario_disabled_query_never_fetches() {
    let (cache, _) = setup(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let query = Query::new(
        cache,
        "k",
        counting(calls.clone()),
        QueryOptions::default().enabled(false),
    );

    query.mount().await;
    query.set_key(Some("k2".to_string())).await;
    query.set_key(Some("k3".to_string())).await;
    query.refetch().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(query.state().data.is_none());
}

#[tokio::test]
async fn scenario_query_reuses_fresh_data_then_refetches_when_stale() {
    let (cache, clock) = setup(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().stale_time(Duration::from_secs(10));
    let query = Query::new(cache, "trainers", counting(calls.clone()), options);

    query.mount().await;
    assert_eq!(query.state().data.as_deref(), Some("trainers#1"));

    clock.advance(Duration::from_secs(5));
    query.set_key(Some("trainers".to_string())).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(6));
    query.set_key(Some("trainers".to_string())).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(query.state().data.as_deref(), Some("trainers#2"));
}

// == SWR ==

#[tokio::test(start_paused = true)]
async fn scenario_swr_recovers_after_three_failures() {
    let (cache, _) = setup(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let flaky: Fetcher<String> = {
        let calls = calls.clone();
        fetcher(move |_key: String| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= 3 {
                    Err(anyhow!("attempt {n} failed"))
                } else {
                    Ok("fresh".to_string())
                }
            }
        })
    };
    let swr = Swr::new(cache.clone(), Some("feed".to_string()), flaky, SwrOptions::default());

    swr.mount().await;

    let state = swr.state();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(state.error.is_none());
    assert_eq!(state.data.as_deref(), Some("fresh"));
    assert!(!state.is_loading);
    assert!(!state.is_validating);
    assert_eq!(cache.get::<String>("feed").as_deref(), Some("fresh"));
}

#[tokio::test]
async fn scenario_swr_local_mutate_skips_fetch() {
    let (cache, _) = setup(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let swr = Swr::new(
        cache,
        Some("feed".to_string()),
        counting(calls.clone()),
        SwrOptions::default(),
    );

    swr.mount().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    swr.mutate_value("optimistic".to_string(), false).await;
    assert_eq!(swr.state().data.as_deref(), Some("optimistic"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(swr.mutate().await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(swr.state().data.as_deref(), Some("feed#2"));
}

#[tokio::test]
async fn scenario_swr_shares_cache_with_query() {
    let (cache, _) = setup(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let swr = Swr::new(
        cache.clone(),
        Some("shared".to_string()),
        counting(calls.clone()),
        SwrOptions::default(),
    );

    swr.mount().await;

    let value = cache
        .get_or_fetch("shared", || async { Err::<String, _>(anyhow!("must not run")) }, None)
        .await
        .unwrap();
    assert_eq!(value, "shared#1");
}
