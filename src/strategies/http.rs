//! Conditional HTTP Fetch Strategy
//!
//! Sends the stored validators as `If-None-Match` / `If-Modified-Since`
//! and treats a bodiless response with a validator as 304 Not Modified.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{IF_MODIFIED_SINCE, IF_NONE_MATCH},
    HeaderMap, HeaderName, HeaderValue,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{HttpCacheEntry, Validators};
use crate::error::FetchError;
use crate::facade::Cache;
use crate::fetch::{HttpFetcher, HttpResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpQueryOptions {
    /// When false the fetcher is never invoked
    pub enabled: bool,
    /// TTL for stored responses; store default when None
    pub ttl: Option<Duration>,
}

impl Default for HttpQueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpQueryState<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// The last response was a 304 served from cache
    pub not_modified: bool,
}

impl<T> Default for HttpQueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            etag: None,
            last_modified: None,
            not_modified: false,
        }
    }
}

struct Shared<T> {
    cache: Cache,
    key: String,
    fetcher: HttpFetcher<T>,
    options: HttpQueryOptions,
    state: watch::Sender<HttpQueryState<T>>,
}

/// One conditional-fetch subscription. Clones share state.
pub struct HttpQuery<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for HttpQuery<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> HttpQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle subscription. Nothing is fetched until [`HttpQuery::mount`].
    pub fn new(
        cache: Cache,
        key: impl Into<String>,
        fetcher: HttpFetcher<T>,
        options: HttpQueryOptions,
    ) -> Self {
        let (state, _) = watch::channel(HttpQueryState::default());
        Self {
            shared: Arc::new(Shared {
                cache,
                key: key.into(),
                fetcher,
                options,
                state,
            }),
        }
    }

    /// The request key, also used as the HTTP cache key.
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<HttpQueryState<T>> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> HttpQueryState<T> {
        self.shared.state.borrow().clone()
    }

    /// Initial conditional fetch.
    pub async fn mount(&self) {
        self.fetch().await;
    }

    /// Fetches again, sending whatever validators are cached.
    pub async fn refetch(&self) {
        self.fetch().await;
    }

    async fn fetch(&self) {
        let shared = &self.shared;
        if !shared.options.enabled {
            return;
        }
        let key = shared.key.clone();

        let cached = shared.cache.get_http::<T>(&key);
        let headers = cached
            .as_ref()
            .map(conditional_headers)
            .unwrap_or_default();

        shared.state.send_modify(|s| s.is_loading = true);

        match (shared.fetcher)(key.clone(), headers).await {
            Ok(response) if response.is_not_modified() => {
                debug!(key = %key, "not modified, serving cached payload");
                let served = cached.map(|entry| entry.entry.value);
                shared.state.send_modify(|s| {
                    if served.is_some() {
                        s.data = served;
                    }
                    s.error = None;
                    s.is_loading = false;
                    s.etag = response.etag;
                    s.last_modified = response.last_modified;
                    s.not_modified = true;
                });
            }
            Ok(response) => {
                let HttpResponse {
                    data,
                    etag,
                    last_modified,
                    headers,
                } = response;
                if let Some(value) = &data {
                    let validators = Validators {
                        etag: etag.clone(),
                        last_modified: last_modified.clone(),
                        headers,
                    };
                    shared
                        .cache
                        .set_http(key.clone(), value.clone(), validators, shared.options.ttl);
                }
                shared.state.send_modify(|s| {
                    s.data = data;
                    s.error = None;
                    s.is_loading = false;
                    s.etag = etag;
                    s.last_modified = last_modified;
                    s.not_modified = false;
                });
            }
            Err(err) => {
                let err = FetchError::new(err);
                warn!(key = %key, error = %err, "conditional fetch failed");
                shared.state.send_modify(|s| {
                    s.error = Some(err);
                    s.is_loading = false;
                });
            }
        }
    }
}

/// Builds `If-None-Match` / `If-Modified-Since` from a cached entry.
pub fn conditional_headers<T>(entry: &HttpCacheEntry<T>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_validator(&mut headers, IF_NONE_MATCH, entry.etag.as_deref());
    insert_validator(&mut headers, IF_MODIFIED_SINCE, entry.last_modified.as_deref());
    headers
}

fn insert_validator(headers: &mut HeaderMap, name: HeaderName, value: Option<&str>) {
    let Some(raw) = value else {
        return;
    };
    match HeaderValue::from_str(raw) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, value = raw, "skipping unrepresentable validator"),
    }
}
