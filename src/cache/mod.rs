//! Cache Module
//!
//! The two backing stores: a bounded memory cache with statistics and a
//! validator-aware HTTP cache.

mod entry;
mod http;
mod invalidate;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use http::{HttpCache, HttpCacheEntry, Validators};
pub use invalidate::InvalidateOptions;
pub use stats::CacheStats;
pub use store::MemoryCache;
