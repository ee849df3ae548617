//! Stale-While-Revalidate Strategy
//!
//! Every activation serves whatever the cache holds right away and then
//! revalidates it. Activations arrive as [`SwrTrigger`]s through
//! [`Swr::dispatch`]; focus, reconnect and interval sources are plain
//! producers of those triggers (see `crate::tasks`).

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::facade::Cache;
use crate::fetch::Fetcher;

// == Options ==
#[derive(Debug, Clone, PartialEq)]
pub struct SwrOptions {
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    /// Activations this soon after the last fetch start are skipped
    pub deduping_interval: Duration,
    /// Period of interval revalidation; zero disables it
    pub refresh_interval: Duration,
    /// Retries after a failed fetch before giving up
    pub error_retry_count: u32,
    /// Fixed delay between retries
    pub error_retry_interval: Duration,
    /// TTL for values written to the cache; store default when None
    pub ttl: Option<Duration>,
}

impl Default for SwrOptions {
    fn default() -> Self {
        Self {
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            deduping_interval: Duration::from_millis(2_000),
            refresh_interval: Duration::ZERO,
            error_retry_count: 3,
            error_retry_interval: Duration::from_millis(5_000),
            ttl: None,
        }
    }
}

/// Events that can start a revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwrTrigger {
    Mount,
    /// The consumer regained focus
    Focus,
    /// Network connectivity came back
    Reconnect,
    /// Refresh interval elapsed
    Interval,
    /// Explicit `mutate()` without data; bypasses deduplication
    Mutate,
}

// == State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwrStatus {
    Idle,
    /// Fetching with nothing to show yet
    Loading,
    /// Fetching behind stale data
    Validating,
    Ready,
    Error,
}

#[derive(Debug, Clone)]
pub struct SwrState<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
    pub is_validating: bool,
}

impl<T> SwrState<T> {
    pub fn status(&self) -> SwrStatus {
        if self.is_loading {
            SwrStatus::Loading
        } else if self.is_validating {
            SwrStatus::Validating
        } else if self.error.is_some() {
            SwrStatus::Error
        } else if self.data.is_some() {
            SwrStatus::Ready
        } else {
            SwrStatus::Idle
        }
    }
}

impl<T> Default for SwrState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_validating: false,
        }
    }
}

#[derive(Debug, Default)]
struct Tracking {
    last_fetch_started_ms: Option<u64>,
    retry_count: u32,
}

struct Shared<T> {
    cache: Cache,
    key: Option<String>,
    fetcher: Fetcher<T>,
    options: SwrOptions,
    tracking: Mutex<Tracking>,
    state: watch::Sender<SwrState<T>>,
}

// == Swr ==
/// A stale-while-revalidate subscription for one key. Clones share state,
/// so a clone can be moved into a background task.
pub struct Swr<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Swr<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Swr<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a subscription. A `None` key never fetches.
    pub fn new(
        cache: Cache,
        key: Option<String>,
        fetcher: Fetcher<T>,
        options: SwrOptions,
    ) -> Self {
        let (state, _) = watch::channel(SwrState::default());
        Self {
            shared: Arc::new(Shared {
                cache,
                key,
                fetcher,
                options,
                tracking: Mutex::new(Tracking::default()),
                state,
            }),
        }
    }

    /// The cache key, `None` for a parked subscription.
    pub fn key(&self) -> Option<&str> {
        self.shared.key.as_deref()
    }

    /// Options fixed at construction.
    pub fn options(&self) -> &SwrOptions {
        &self.shared.options
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SwrState<T>> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SwrState<T> {
        self.shared.state.borrow().clone()
    }

    // == Dispatch ==
    /// Feeds one trigger through the state machine.
    ///
    /// Returns true if a fetch cycle ran, false if the trigger was disabled
    /// by options or deduplicated.
    pub async fn dispatch(&self, trigger: SwrTrigger) -> bool {
        let options = &self.shared.options;
        let enabled = match trigger {
            SwrTrigger::Mount | SwrTrigger::Mutate => true,
            SwrTrigger::Focus => options.revalidate_on_focus,
            SwrTrigger::Reconnect => options.revalidate_on_reconnect,
            SwrTrigger::Interval => !options.refresh_interval.is_zero(),
        };
        if !enabled {
            debug!(?trigger, "swr trigger disabled");
            return false;
        }
        self.revalidate(trigger).await
    }

    /// Mounts the subscription.
    pub async fn mount(&self) -> bool {
        self.dispatch(SwrTrigger::Mount).await
    }

    // == Mutate ==
    /// Forces a revalidation now.
    pub async fn mutate(&self) -> bool {
        self.dispatch(SwrTrigger::Mutate).await
    }

    /// Replaces the data locally, then optionally revalidates.
    pub async fn mutate_value(&self, value: T, revalidate: bool) {
        self.write_local(value);
        if revalidate {
            self.dispatch(SwrTrigger::Mutate).await;
        }
    }

    /// Derives new data from the current data, then optionally revalidates.
    pub async fn mutate_with<F>(&self, update: F, revalidate: bool)
    where
        F: FnOnce(Option<T>) -> T,
    {
        let current = self.shared.state.borrow().data.clone();
        self.write_local(update(current));
        if revalidate {
            self.dispatch(SwrTrigger::Mutate).await;
        }
    }

    /// Writes the data once `pending` resolves, then optionally revalidates.
    ///
    /// A failed future leaves the data untouched and sets `error`.
    pub async fn mutate_future<Fut, E>(&self, pending: Fut, revalidate: bool)
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        match pending.await {
            Ok(value) => self.write_local(value),
            Err(err) => {
                let err = FetchError::new(err);
                warn!(
                    key = self.key().unwrap_or("-"),
                    error = %err,
                    "swr optimistic update failed"
                );
                self.shared.state.send_modify(|s| s.error = Some(err));
            }
        }
        if revalidate {
            self.dispatch(SwrTrigger::Mutate).await;
        }
    }

    fn write_local(&self, value: T) {
        if let Some(key) = &self.shared.key {
            self.shared
                .cache
                .set(key.clone(), value.clone(), self.shared.options.ttl);
        }
        self.shared.state.send_modify(|s| s.data = Some(value));
    }

    // == Revalidate ==
    async fn revalidate(&self, trigger: SwrTrigger) -> bool {
        let shared = &self.shared;
        let Some(key) = shared.key.clone() else {
            return false;
        };

        let now = shared.cache.clock().now_ms();
        {
            let mut tracking = self.tracking();
            if trigger != SwrTrigger::Mutate {
                if let Some(started) = tracking.last_fetch_started_ms {
                    let since = now.saturating_sub(started);
                    if u128::from(since) < shared.options.deduping_interval.as_millis() {
                        debug!(
                            key = %key,
                            ?trigger,
                            since_ms = since,
                            "swr revalidation deduplicated"
                        );
                        return false;
                    }
                }
            }
            tracking.last_fetch_started_ms = Some(now);
        }

        let cached = shared.cache.get::<T>(&key);
        // Nothing to serve from the cache: block as loading, but keep the
        // previous data visible
        let is_loading = cached.is_none();
        shared.state.send_modify(|s| {
            if cached.is_some() {
                s.data = cached;
            }
            s.is_loading = is_loading;
            s.is_validating = true;
        });
        debug!(key = %key, ?trigger, "swr revalidating");

        loop {
            match (shared.fetcher)(key.clone()).await {
                Ok(value) => {
                    shared.cache.set(key.clone(), value.clone(), shared.options.ttl);
                    self.tracking().retry_count = 0;
                    shared.state.send_modify(|s| {
                        s.data = Some(value);
                        s.error = None;
                        s.is_loading = false;
                        s.is_validating = false;
                    });
                    return true;
                }
                Err(err) => {
                    let err = FetchError::new(err);
                    let attempt = {
                        let mut tracking = self.tracking();
                        tracking.retry_count += 1;
                        tracking.retry_count
                    };
                    shared.state.send_modify(|s| s.error = Some(err.clone()));

                    if attempt <= shared.options.error_retry_count {
                        warn!(key = %key, attempt, error = %err, "swr fetch failed, retrying");
                        tokio::time::sleep(shared.options.error_retry_interval).await;
                        continue;
                    }

                    info!(key = %key, error = %err, "swr fetch failed, retries exhausted");
                    self.tracking().retry_count = 0;
                    shared.state.send_modify(|s| {
                        s.is_loading = false;
                        s.is_validating = false;
                    });
                    return true;
                }
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
