//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// A TTL of zero (or an unset `CACHE_TTL_SECS`) means entries never expire.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry may go without a timer reset before expiring.
    /// `None` means entries never expire.
    pub ttl: Option<Duration>,
    /// Whether every successful read refreshes the entry timer
    pub reset_on_access: bool,
    /// Whether re-adding an existing key refreshes the entry timer
    pub reset_on_add: bool,
    /// Background reaper sweep interval
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Entry TTL in seconds; 0 or unset means never expire
    /// - `CACHE_RESET_ON_ACCESS` - "true"/"1" to reset timers on read (default: false)
    /// - `CACHE_RESET_ON_ADD` - "true"/"1" to reset timers on re-add (default: false)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Reaper sweep interval in seconds (default: 1)
    pub fn from_env() -> Self {
        Self {
            ttl: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
            reset_on_access: env::var("CACHE_RESET_ON_ACCESS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            reset_on_add: env::var("CACHE_RESET_ON_ADD")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(1)),
        }
    }

    /// Convenience constructor for a cache with the given TTL and
    /// default flags.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: if ttl.is_zero() { None } else { Some(ttl) },
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            reset_on_access: false,
            reset_on_add: false,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, None);
        assert!(!config.reset_on_access);
        assert!(!config.reset_on_add);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_TTL_SECS");
        env::remove_var("CACHE_RESET_ON_ACCESS");
        env::remove_var("CACHE_RESET_ON_ADD");
        env::remove_var("CACHE_SWEEP_INTERVAL_SECS");

        let config = CacheConfig::from_env();
        assert_eq!(config.ttl, None);
        assert!(!config.reset_on_access);
        assert!(!config.reset_on_add);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_with_ttl() {
        let config = CacheConfig::with_ttl(Duration::from_secs(60));
        assert_eq!(config.ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_config_zero_ttl_means_never_expire() {
        let config = CacheConfig::with_ttl(Duration::ZERO);
        assert_eq!(config.ttl, None);
    }
}
