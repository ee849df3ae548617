//! Fetch Cache - client-side caching core for asynchronous data fetching
//!
//! A TTL memory cache and an ETag/Last-Modified aware HTTP cache behind one
//! facade, plus the fetch strategies built on it: cache-then-fetch queries,
//! stale-while-revalidate subscriptions and conditional HTTP fetches.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod fetch;
pub mod models;
pub mod strategies;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheEntry, CacheStats, HttpCacheEntry, InvalidateOptions, Validators};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, FetchError};
pub use facade::Cache;
pub use fetch::{fetcher, http_fetcher, Fetcher, HttpFetcher, HttpResponse};
pub use strategies::{
    HttpQuery, HttpQueryOptions, HttpQueryState, Query, QueryOptions, QueryState, QueryStatus,
    Swr, SwrOptions, SwrState, SwrStatus, SwrTrigger,
};
pub use tasks::{spawn_refresh_task, spawn_trigger_listener, spawn_validity_watch};
