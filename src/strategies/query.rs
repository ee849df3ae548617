//! Query Strategy
//!
//! Cache-then-fetch with a per-consumer staleness window. A `Query` is one
//! consumer subscription: it remembers when *it* last fetched successfully
//! and only trusts the cache within `stale_time` of that moment.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::facade::Cache;
use crate::fetch::Fetcher;

/// Default window during which this consumer trusts cached data (5 minutes).
pub const DEFAULT_STALE_TIME: Duration = Duration::from_millis(300_000);
/// Default TTL for values this consumer writes to the cache (10 minutes).
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_millis(600_000);

type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

// == Options ==
pub struct QueryOptions<T> {
    /// When false the fetcher is never invoked
    pub enabled: bool,
    pub stale_time: Duration,
    pub cache_time: Duration,
    /// Called once per successful fetch
    pub on_success: Option<SuccessCallback<T>>,
    /// Called once per failed fetch
    pub on_error: Option<ErrorCallback>,
}

impl<T> QueryOptions<T> {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: DEFAULT_STALE_TIME,
            cache_time: DEFAULT_CACHE_TIME,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            stale_time: self.stale_time,
            cache_time: self.cache_time,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("enabled", &self.enabled)
            .field("stale_time", &self.stale_time)
            .field("cache_time", &self.cache_time)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// == State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// What a query consumer currently sees.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub status: QueryStatus,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
        }
    }
}

#[derive(Debug, Default)]
struct Tracking {
    key: Option<String>,
    /// Time of this consumer's last successful fetch
    last_fetch_ms: Option<u64>,
}

struct Shared<T> {
    cache: Cache,
    fetcher: Fetcher<T>,
    options: QueryOptions<T>,
    tracking: Mutex<Tracking>,
    state: watch::Sender<QueryState<T>>,
}

// == Query ==
/// One cache-then-fetch subscription. Clones share state.
pub struct Query<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle query. Nothing is fetched until [`Query::mount`].
    pub fn new(
        cache: Cache,
        key: impl Into<String>,
        fetcher: Fetcher<T>,
        options: QueryOptions<T>,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            shared: Arc::new(Shared {
                cache,
                fetcher,
                options,
                tracking: Mutex::new(Tracking {
                    key: Some(key.into()),
                    last_fetch_ms: None,
                }),
                state,
            }),
        }
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QueryState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn key(&self) -> Option<String> {
        self.tracking().key.clone()
    }

    /// Initial load.
    pub async fn mount(&self) {
        self.load(false).await;
    }

    /// Switches to a new key and loads it. `None` parks the query.
    pub async fn set_key(&self, key: Option<String>) {
        {
            let mut tracking = self.tracking();
            if tracking.key != key {
                tracking.last_fetch_ms = None;
            }
            tracking.key = key;
        }
        self.load(false).await;
    }

    /// Fetches regardless of staleness.
    pub async fn refetch(&self) {
        self.load(true).await;
    }

    async fn load(&self, force: bool) {
        let shared = &self.shared;
        if !shared.options.enabled {
            return;
        }
        let (key, last_fetch_ms) = {
            let tracking = self.tracking();
            match &tracking.key {
                Some(key) => (key.clone(), tracking.last_fetch_ms),
                None => return,
            }
        };

        let cached = shared.cache.get::<T>(&key);
        if !force {
            if let (Some(value), Some(last)) = (&cached, last_fetch_ms) {
                let elapsed = shared.cache.clock().now_ms().saturating_sub(last);
                if u128::from(elapsed) < shared.options.stale_time.as_millis() {
                    debug!(key = %key, elapsed_ms = elapsed, "query served from cache");
                    let value = value.clone();
                    shared.state.send_modify(|s| {
                        s.data = Some(value);
                        s.error = None;
                        s.status = QueryStatus::Success;
                    });
                    return;
                }
            }
        }

        shared.state.send_modify(|s| {
            if s.data.is_none() {
                s.data = cached;
            }
            s.status = QueryStatus::Loading;
        });

        match (shared.fetcher)(key.clone()).await {
            Ok(value) => {
                shared
                    .cache
                    .set(key.clone(), value.clone(), Some(shared.options.cache_time));
                self.tracking().last_fetch_ms = Some(shared.cache.clock().now_ms());
                if let Some(on_success) = &shared.options.on_success {
                    on_success(&value);
                }
                shared.state.send_modify(|s| {
                    s.data = Some(value);
                    s.error = None;
                    s.status = QueryStatus::Success;
                });
            }
            Err(err) => {
                let err = FetchError::new(err);
                warn!(key = %key, error = %err, "query fetch failed");
                if let Some(on_error) = &shared.options.on_error {
                    on_error(&err);
                }
                shared.state.send_modify(|s| {
                    s.error = Some(err);
                    s.status = QueryStatus::Error;
                });
            }
        }
    }

    fn tracking(&self) -> MutexGuard<'_, Tracking> {
        self.shared
            .tracking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
