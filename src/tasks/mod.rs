//! Background Tasks
//!
//! Long-running producers that drive the strategies without a UI around
//! them.
//!
//! - SWR refresh: periodic `Interval` triggers and an external trigger feed
//! - HTTP validity: re-evaluates `is_http_valid` on a fixed period

mod refresh;
mod validity;

pub use refresh::{spawn_refresh_task, spawn_trigger_listener};
pub use validity::{spawn_validity_watch, HTTP_VALIDITY_POLL};
