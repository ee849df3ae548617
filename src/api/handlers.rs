//! API Handlers
//!
//! Read-mostly inspection endpoints over a shared [`Cache`]. Every handler
//! works on the same facade instance the strategies in the process use.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::facade::Cache;
use crate::models::{
    DeleteResponse, HealthResponse, InvalidateRequest, KeysResponse, RemovedResponse,
    StatsResponse, ValidityQuery, ValidityResponse,
};

/// Application state shared across all handlers.
///
/// `Cache` is already a cheap handle around shared stores, so no extra
/// locking is needed here.
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Builds a fresh cache from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Cache::new(config.cache.clone()))
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Counters are cumulative since start; `clear` does not reset them.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(
        stats,
        state.cache.http_len(),
        state.cache.config(),
    ))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys()))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key) {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
///
/// Drops every memory entry. Reports how many were held at the time.
pub async fn clear_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.cache.stats().size;
    state.cache.clear();
    info!(removed, "Cache cleared via API");
    Json(RemovedResponse::new(removed))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<RemovedResponse>> {
    let opts = req.into_options()?;
    let removed = state.cache.invalidate(&opts);
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for GET /http/:key/valid
pub async fn http_valid_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ValidityQuery>,
) -> Json<ValidityResponse> {
    let valid = state.cache.is_http_valid(&key, query.etag.as_deref());
    let ttl_remaining_ms = state.cache.http_ttl_remaining_ms(&key);
    Json(ValidityResponse {
        key,
        etag: query.etag,
        valid,
        ttl_remaining_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Validators;
    use crate::config::CacheConfig;

    fn state() -> AppState {
        AppState::new(Cache::new(CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        state.cache.set("to_delete", 1u32, None);

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());
        assert!(!state.cache.has("to_delete"));
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let result = delete_handler(State(state()), Path("nope".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handler_reports_http_entries() {
        let state = state();
        state.cache.set_http("/a", 1u8, Validators::new(), None);
        let _ = state.cache.get::<u8>("missing");

        let response = stats_handler(State(state)).await;
        assert_eq!(response.misses, 1);
        assert_eq!(response.http_entries, 1);
    }

    #[tokio::test]
    async fn test_clear_handler_keeps_counters() {
        let state = state();
        state.cache.set("a", 1u8, None);
        let _ = state.cache.get::<u8>("a");

        let response = clear_handler(State(state.clone())).await;
        assert_eq!(response.removed, 1);

        let stats = state.cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_invalidate_handler_by_pattern() {
        let state = state();
        state.cache.set("trainer:1", 1u8, None);
        state.cache.set("trainer:2", 2u8, None);
        state.cache.set("review:1", 3u8, None);

        let req = InvalidateRequest {
            pattern: Some("^trainer:".to_string()),
            older_than_ms: None,
        };
        let response = invalidate_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.removed, 2);
        assert_eq!(state.cache.keys(), vec!["review:1".to_string()]);
    }

    #[tokio::test]
    async fn test_http_valid_handler() {
        let state = state();
        state.cache.set_http("/a", 1u8, Validators::new().with_etag("\"v1\""), None);

        let query = ValidityQuery {
            etag: Some("\"v1\"".to_string()),
        };
        let response = http_valid_handler(State(state), Path("/a".to_string()), Query(query)).await;
        assert!(response.valid);
        assert!(response.ttl_remaining_ms.is_some());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
