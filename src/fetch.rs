//! Fetcher Adapters
//!
//! Strategies hold caller-supplied async fetch functions behind shared,
//! boxed trait objects so they can be cloned into background tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderMap;
use futures::future::{BoxFuture, FutureExt};

/// Boxed future returned by a fetcher.
pub type FetchFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Loads the value for a key.
pub type Fetcher<T> = Arc<dyn Fn(String) -> FetchFuture<T> + Send + Sync>;

/// Loads the response for a key given the conditional request headers.
pub type HttpFetcher<T> =
    Arc<dyn Fn(String, HeaderMap) -> FetchFuture<HttpResponse<T>> + Send + Sync>;

/// Wraps an async closure as a [`Fetcher`].
///
/// Any error type convertible into `anyhow::Error` is accepted.
pub fn fetcher<T, E, F, Fut>(f: F) -> Fetcher<T>
where
    T: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move |key| {
        let fut = f(key);
        async move { fut.await.map_err(Into::into) }.boxed()
    })
}

/// Wraps an async closure as an [`HttpFetcher`].
pub fn http_fetcher<T, E, F, Fut>(f: F) -> HttpFetcher<T>
where
    T: Send + 'static,
    E: Into<anyhow::Error> + 'static,
    F: Fn(String, HeaderMap) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse<T>, E>> + Send + 'static,
{
    Arc::new(move |key, headers| {
        let fut = f(key, headers);
        async move { fut.await.map_err(Into::into) }.boxed()
    })
}

// == HTTP Response ==
/// What an HTTP fetcher hands back.
///
/// `data: None` together with a validator means the server answered
/// 304 Not Modified.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse<T> {
    pub data: Option<T>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub headers: HashMap<String, String>,
}

impl<T> HttpResponse<T> {
    /// A response carrying a new payload.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            etag: None,
            last_modified: None,
            headers: HashMap::new(),
        }
    }

    /// A bodiless response. Add a validator to mark it as 304.
    pub fn empty() -> Self {
        Self {
            data: None,
            etag: None,
            last_modified: None,
            headers: HashMap::new(),
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = Some(last_modified.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_not_modified(&self) -> bool {
        self.data.is_none() && (self.etag.is_some() || self.last_modified.is_some())
    }
}
