//! Request and response models for the inspection API

pub mod requests;
pub mod responses;

pub use requests::{InvalidateRequest, ValidityQuery};
pub use responses::{
    DeleteResponse, HealthResponse, KeysResponse, RemovedResponse, StatsResponse,
    ValidityResponse,
};
