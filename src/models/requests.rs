//! Request DTOs for the inspection API

use std::time::Duration;

use serde::Deserialize;

use crate::cache::InvalidateOptions;
use crate::error::{CacheError, Result};

/// Request body for `POST /invalidate`
///
/// At least one of the filters must be present; an entry is removed when
/// it matches either one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Regular expression matched against keys
    #[serde(default)]
    pub pattern: Option<String>,
    /// Remove entries written more than this many milliseconds ago
    #[serde(default)]
    pub older_than_ms: Option<u64>,
}

impl InvalidateRequest {
    /// Compiles the request into store-level options.
    pub fn into_options(self) -> Result<InvalidateOptions> {
        if self.pattern.is_none() && self.older_than_ms.is_none() {
            return Err(CacheError::InvalidRequest(
                "pattern or older_than_ms is required".to_string(),
            ));
        }

        let mut opts = InvalidateOptions::new();
        if let Some(pattern) = self.pattern.as_deref() {
            opts = opts.with_pattern(pattern)?;
        }
        if let Some(ms) = self.older_than_ms {
            opts = opts.with_older_than(Duration::from_millis(ms));
        }
        Ok(opts)
    }
}

/// Query string for `GET /http/:key/valid`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidityQuery {
    #[serde(default)]
    pub etag: Option<String>,
}
