//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Plain-data cache settings.
///
/// Function-valued options (clock, default expiration, hooks) are not part of
/// the config; they are supplied through [`crate::CacheBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime given to entries set without an explicit expiration, in clock units
    pub default_max_age: Option<u64>,
    /// Maximum number of entries before LRU eviction; None or 0 = unbounded
    pub lru_max_size: Option<usize>,
    /// Background expiry sweep period; None or zero = disabled
    pub cleanup_interval: Option<Duration>,
    /// Expiration window width in clock units; None = default rescaled to the clock
    pub expiry_bucket_size: Option<u64>,
    /// Return expired entries from `get` instead of reporting a miss
    pub get_expired: bool,
    /// Delete expired entries when `get` runs into them
    pub delete_expired_on_get: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_MAX_AGE` - Default max age in clock units (default: none)
    /// - `CACHE_LRU_MAX_SIZE` - Maximum cache entries (default: unbounded)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Cleanup frequency in milliseconds (default: disabled)
    /// - `CACHE_EXPIRY_BUCKET_SIZE` - Expiration window width (default: 300000 ms, rescaled)
    /// - `CACHE_GET_EXPIRED` - `true` to return expired entries (default: false)
    /// - `CACHE_DELETE_EXPIRED_ON_GET` - `true` to delete expired entries on get (default: false)
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            default_max_age: env_var("CACHE_DEFAULT_MAX_AGE"),
            lru_max_size: env_var("CACHE_LRU_MAX_SIZE"),
            cleanup_interval: env_var("CACHE_CLEANUP_INTERVAL_MS").map(Duration::from_millis),
            expiry_bucket_size: env_var("CACHE_EXPIRY_BUCKET_SIZE"),
            get_expired: env_var("CACHE_GET_EXPIRED").unwrap_or(false),
            delete_expired_on_get: env_var("CACHE_DELETE_EXPIRED_ON_GET").unwrap_or(false),
        }
    }
}

fn env_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
