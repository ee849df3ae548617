//! Response DTOs for the inspection API

use serde::Serialize;

use crate::cache::CacheStats;
use crate::config::CacheConfig;

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries in the memory store, expired-but-unread ones included
    pub size: usize,
    pub hit_rate: f64,
    /// Entries in the HTTP store
    pub http_entries: usize,
    pub max_size: usize,
    pub default_ttl_ms: u64,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, http_entries: usize, config: &CacheConfig) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            size: stats.size,
            hit_rate: stats.hit_rate,
            http_entries,
            max_size: config.max_size,
            default_ttl_ms: config.default_ttl.as_millis() as u64,
        }
    }
}

/// Response body for `GET /keys`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for `DELETE /cache` and `POST /invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

impl RemovedResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for `GET /http/:key/valid`
#[derive(Debug, Clone, Serialize)]
pub struct ValidityResponse {
    pub key: String,
    pub etag: Option<String>,
    pub valid: bool,
    /// Remaining lifetime of the entry, absent once expired
    pub ttl_remaining_ms: Option<u64>,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current time, RFC 3339
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
