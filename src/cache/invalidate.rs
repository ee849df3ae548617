//! Invalidation Options
//!
//! Bulk removal filters shared by the memory cache and the facade.

use std::time::Duration;

use regex::Regex;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Filters for `invalidate`.
///
/// Each filter removes the entries it matches on its own; supplying both
/// removes the union.
#[derive(Debug, Clone, Default)]
pub struct InvalidateOptions {
    /// Keys matching this expression are removed
    pub pattern: Option<Regex>,
    /// Entries created more than this long ago are removed
    pub older_than: Option<Duration>,
}

impl InvalidateOptions {
    /// Creates options that match nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key pattern. Fails if `pattern` is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Adds an age threshold.
    pub fn with_older_than(mut self, age: Duration) -> Self {
        self.older_than = Some(age);
        self
    }

    /// True when neither filter is set.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.older_than.is_none()
    }

    /// Whether `entry` should be removed at time `now_ms`.
    pub fn matches<V>(&self, entry: &CacheEntry<V>, now_ms: u64) -> bool {
        let by_pattern = self
            .pattern
            .as_ref()
            .is_some_and(|re| re.is_match(&entry.key));
        let by_age = self.older_than.is_some_and(|age| {
            let cutoff = now_ms.saturating_sub(u64::try_from(age.as_millis()).unwrap_or(u64::MAX));
            entry.timestamp < cutoff
        });
        by_pattern || by_age
    }
}
