//! Revalidation Tasks
//!
//! Background producers of SWR triggers: a periodic refresh ticker and a
//! listener that forwards external events (focus, reconnect) from a channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::strategies::{Swr, SwrTrigger};

/// Spawns a task that dispatches [`SwrTrigger::Interval`] every
/// `refresh_interval`.
///
/// Returns `None` when the subscription's refresh interval is zero. Abort
/// the handle to stop refreshing.
///
/// # Example
/// ```ignore
/// let ticker = spawn_refresh_task(swr.clone());
/// // Later, when the consumer goes away:
/// if let Some(handle) = ticker { handle.abort(); }
/// ```
pub fn spawn_refresh_task<T>(swr: Swr<T>) -> Option<JoinHandle<()>>
where
    T: Clone + Send + Sync + 'static,
{
    let interval = swr.options().refresh_interval;
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        info!(
            key = swr.key().unwrap_or("-"),
            interval_ms = interval.as_millis() as u64,
            "Starting SWR refresh task"
        );

        loop {
            tokio::time::sleep(interval).await;

            if !swr.dispatch(SwrTrigger::Interval).await {
                debug!("SWR refresh tick skipped");
            }
        }
    }))
}

/// Spawns a task that feeds every trigger received on `triggers` into
/// `swr.dispatch`.
///
/// Each trigger is dispatched on its own task so a slow fetch does not hold
/// later triggers back; overlapping ones fall into the dedup window. The
/// task ends when every sender is dropped.
pub fn spawn_trigger_listener<T>(
    swr: Swr<T>,
    mut triggers: mpsc::Receiver<SwrTrigger>,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(trigger) = triggers.recv().await {
            debug!(?trigger, "SWR trigger received");
            let swr = swr.clone();
            tokio::spawn(async move {
                swr.dispatch(trigger).await;
            });
        }
        info!(key = swr.key().unwrap_or("-"), "SWR trigger source closed");
    })
}
