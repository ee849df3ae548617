//! HTTP Validity Watch
//!
//! Periodically re-checks whether an HTTP cache entry is still usable for a
//! given ETag and publishes the answer on a watch channel.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::facade::Cache;

/// Default polling period for [`spawn_validity_watch`].
pub const HTTP_VALIDITY_POLL: Duration = Duration::from_secs(60);

/// Spawns a task that evaluates `cache.is_http_valid(key, etag)` immediately
/// and then every `period`.
///
/// Receivers see only changes. The task exits once every receiver is dropped.
pub fn spawn_validity_watch(
    cache: Cache,
    key: impl Into<String>,
    etag: Option<String>,
    period: Duration,
) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let key = key.into();
    let initial = cache.is_http_valid(&key, etag.as_deref());
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        info!(key = %key, period_ms = period.as_millis() as u64, "Starting HTTP validity watch");
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately; the initial value is already published
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => break,
            }

            let valid = cache.is_http_valid(&key, etag.as_deref());
            let changed = tx.send_if_modified(|current| {
                if *current == valid {
                    return false;
                }
                *current = valid;
                true
            });
            if changed {
                debug!(key = %key, valid, "HTTP validity changed");
            }
        }
        debug!(key = %key, "HTTP validity watch stopped");
    });

    (rx, handle)
}
