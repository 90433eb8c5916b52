//! Configuration Module
//!
//! Handles loading and managing engine configuration from environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::duration::parse_duration_ms;

/// Default lifetime of a cached value: 7 days.
pub const DEFAULT_LIFETIME_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Entries expired for longer than this are purged regardless of key: 1 hour.
pub const DEFAULT_HOUSEKEEPING_HORIZON_MS: u64 = 60 * 60 * 1000;

/// Engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime applied when an operation does not specify one
    pub default_lifetime_ms: u64,
    /// Staleness threshold of the housekeeping sweep
    pub housekeeping_horizon_ms: u64,
    /// Directory for the disk-backed store, None = platform cache directory
    pub store_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Creates a new EngineConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHIFY_DEFAULT_LIFETIME` - Default lifetime expression (default: 7d)
    /// - `CACHIFY_HOUSEKEEPING_HORIZON` - Housekeeping horizon expression (default: 1h)
    /// - `CACHIFY_STORE_DIR` - Directory of the disk-backed store (default: unset)
    pub fn from_env() -> Self {
        Self {
            default_lifetime_ms: duration_from_env("CACHIFY_DEFAULT_LIFETIME")
                .unwrap_or(DEFAULT_LIFETIME_MS),
            housekeeping_horizon_ms: duration_from_env("CACHIFY_HOUSEKEEPING_HORIZON")
                .unwrap_or(DEFAULT_HOUSEKEEPING_HORIZON_MS),
            store_dir: env::var("CACHIFY_STORE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_lifetime_ms: DEFAULT_LIFETIME_MS,
            housekeeping_horizon_ms: DEFAULT_HOUSEKEEPING_HORIZON_MS,
            store_dir: None,
        }
    }
}

fn duration_from_env(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match parse_duration_ms(&raw) {
        Ok(ms) => Some(ms),
        Err(e) => {
            warn!("Ignoring {}: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.default_lifetime_ms, 604_800_000);
        assert_eq!(config.housekeeping_horizon_ms, 3_600_000);
        assert!(config.store_dir.is_none());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CACHIFY_DEFAULT_LIFETIME", "2d");
        env::set_var("CACHIFY_HOUSEKEEPING_HORIZON", "not a duration");
        env::set_var("CACHIFY_STORE_DIR", "/tmp/cachify-test");

        let config = EngineConfig::from_env();
        assert_eq!(config.default_lifetime_ms, 172_800_000);
        assert_eq!(config.housekeeping_horizon_ms, DEFAULT_HOUSEKEEPING_HORIZON_MS);
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/cachify-test")));

        env::remove_var("CACHIFY_DEFAULT_LIFETIME");
        env::remove_var("CACHIFY_HOUSEKEEPING_HORIZON");
        env::remove_var("CACHIFY_STORE_DIR");
    }
}
