//! Inspection API
//!
//! A small axum surface for dashboards and operators: cumulative stats,
//! key listing, deletion, invalidation and HTTP cache validity checks.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
