//! API Routes

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, health_handler, http_valid_handler, invalidate_handler,
    keys_handler, stats_handler, AppState,
};

/// Creates the inspection router.
///
/// # Endpoints
/// - `GET /health`
/// - `GET /stats` - cumulative memory cache counters
/// - `GET /keys` - memory cache keys, sorted
/// - `DELETE /cache/:key` - delete one memory entry
/// - `DELETE /cache` - clear the memory cache
/// - `POST /invalidate` - remove by key pattern and/or age
/// - `GET /http/:key/valid?etag=` - HTTP cache validity check
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/keys", get(keys_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/:key", delete(delete_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/http/:key/valid", get(http_valid_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
