//! Fetch Strategies
//!
//! Consumer-facing patterns built on the [`Cache`](crate::facade::Cache)
//! facade. Each one catches fetcher failures and reports them in its
//! state instead of returning them.
//!
//! - [`Query`]: cache-then-fetch with a staleness window
//! - [`Swr`]: stale-while-revalidate with dedup, retry and triggers
//! - [`HttpQuery`]: conditional fetch driven by ETag / Last-Modified

pub mod http;
pub mod query;
pub mod swr;

pub use http::{conditional_headers, HttpQuery, HttpQueryOptions, HttpQueryState};
pub use query::{Query, QueryOptions, QueryState, QueryStatus};
pub use swr::{Swr, SwrOptions, SwrState, SwrStatus, SwrTrigger};
