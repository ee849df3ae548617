//! Configuration Module
//!
//! Cache store configuration plus the inspection server settings loaded
//! from environment variables.

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

/// Default TTL applied when `set` is called without one (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default maximum number of live entries in a memory cache.
pub const DEFAULT_MAX_SIZE: usize = 100;

// == Cache Config ==
/// Per-store configuration, fixed once a store is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL for entries stored without an explicit TTL
    pub default_ttl: Duration,
    /// Entry count at which `set` evicts the oldest entry
    pub max_size: usize,
    /// Names of the enabled store strategies
    pub strategies: BTreeSet<String>,
}

impl CacheConfig {
    /// Overrides the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Overrides the maximum entry count.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Replaces the strategy set.
    pub fn with_strategies<I, S>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies = strategies.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_size: DEFAULT_MAX_SIZE,
            strategies: ["memory", "http"].into_iter().map(String::from).collect(),
        }
    }
}

/// Inspection server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configuration shared by the facade's memory and HTTP stores
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 100)
    /// - `CACHE_STRATEGIES` - Comma separated strategy names (default: memory,http)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();

        let default_ttl = env::var("CACHE_DEFAULT_TTL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.default_ttl);
        let max_size = env::var("CACHE_MAX_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_size);
        let strategies = env::var("CACHE_STRATEGIES")
            .ok()
            .map(|v| parse_strategies(&v))
            .filter(|set| !set.is_empty())
            .unwrap_or(defaults.strategies);

        Self {
            cache: CacheConfig {
                default_ttl,
                max_size,
                strategies,
            },
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
        }
    }
}

fn parse_strategies(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_millis(300_000));
        assert_eq!(config.max_size, 100);
        assert!(config.strategies.contains("memory"));
        assert!(config.strategies.contains("http"));
    }

    #[test]
    fn test_cache_config_builders() {
        let config = CacheConfig::default()
            .with_default_ttl(Duration::from_secs(1))
            .with_max_size(5)
            .with_strategies(["memory"]);
        assert_eq!(config.default_ttl, Duration::from_secs(1));
        assert_eq!(config.max_size, 5);
        assert_eq!(config.strategies.len(), 1);
    }

    #[test]
    fn test_parse_strategies() {
        let set = parse_strategies(" Memory, http ,,");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["http".to_string(), "memory".to_string()]
        );
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_STRATEGIES");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.server_port, 3000);
    }
}
