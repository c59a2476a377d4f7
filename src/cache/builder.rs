//! Cache Builder Module
//!
//! Collects construction options, validates them and assembles a [`Cache`].

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::clock::time_scale as measure_time_scale;
use crate::cache::store::CacheSettings;
use crate::cache::{
    Cache, CacheEntry, Clock, DefaultExpFn, DeleteReason, Hooks, MissReason, SystemClock,
    Timestamp, DEFAULT_EXPIRY_BUCKET_SIZE,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Builder ==
/// A builder for creating [`Cache`] instances.
///
/// Plain settings live in a [`CacheConfig`]; the builder adds the clock, the
/// default expiration function and the hooks on top.
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    default_exp: Option<DefaultExpFn>,
    hooks: Hooks<K, V>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    /// Starts from an existing configuration, e.g. one read from the environment.
    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            clock: None,
            default_exp: None,
            hooks: Hooks::default(),
        }
    }

    /// Time source for expirations. Defaults to [`SystemClock`].
    ///
    /// The default expiry bucket size is rescaled to the clock's unit unless
    /// one is set explicitly.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Expiration used when neither an explicit expiration nor a max age applies.
    pub fn default_exp<F>(mut self, default_exp: F) -> Self
    where
        F: Fn() -> Option<Timestamp> + Send + Sync + 'static,
    {
        self.default_exp = Some(Arc::new(default_exp));
        self
    }

    pub fn default_max_age(mut self, max_age: u64) -> Self {
        self.config.default_max_age = Some(max_age);
        self
    }

    /// Bounds the cache to `max_size` entries. Zero means unbounded.
    pub fn lru_max_size(mut self, max_size: usize) -> Self {
        self.config.lru_max_size = Some(max_size);
        self
    }

    /// Wall-clock period of the background expiry sweep. Zero disables it.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.config.cleanup_interval = Some(interval);
        self
    }

    /// Width of an expiration window, in clock units. Must be positive.
    pub fn expiry_bucket_size(mut self, size: u64) -> Self {
        self.config.expiry_bucket_size = Some(size);
        self
    }

    pub fn get_expired(mut self, get_expired: bool) -> Self {
        self.config.get_expired = get_expired;
        self
    }

    pub fn delete_expired_on_get(mut self, delete_expired_on_get: bool) -> Self {
        self.config.delete_expired_on_get = delete_expired_on_get;
        self
    }

    pub fn on_get_hit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Cache<K, V>, &K) + Send + Sync + 'static,
    {
        self.hooks.on_get_hit = Some(Arc::new(hook));
        self
    }

    pub fn on_get_miss<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Cache<K, V>, &K, MissReason) + Send + Sync + 'static,
    {
        self.hooks.on_get_miss = Some(Arc::new(hook));
        self
    }

    pub fn on_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Cache<K, V>, &K, &CacheEntry<V>, DeleteReason) + Send + Sync + 'static,
    {
        self.hooks.on_delete = Some(Arc::new(hook));
        self
    }

    pub fn on_delete_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.hooks.on_delete_expired = Some(Arc::new(hook));
        self
    }

    // == Build ==
    /// Validates the options and creates the cache.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] if an explicit expiry bucket size is zero.
    pub fn build(self) -> Result<Cache<K, V>> {
        if self.config.expiry_bucket_size == Some(0) {
            return Err(CacheError::InvalidConfig(
                "expiry bucket size must be positive".to_string(),
            ));
        }
        Ok(self.build_unchecked())
    }

    /// Assembles the cache, normalizing instead of rejecting.
    pub(crate) fn build_unchecked(self) -> Cache<K, V> {
        let (clock, time_scale): (Arc<dyn Clock>, f64) = match self.clock {
            Some(clock) => {
                let scale = measure_time_scale(clock.as_ref());
                (clock, scale)
            }
            None => (Arc::new(SystemClock), 1.0),
        };

        let expiry_bucket_size = self
            .config
            .expiry_bucket_size
            .filter(|&size| size > 0)
            .unwrap_or_else(|| scaled_bucket_size(time_scale));

        let settings = CacheSettings {
            clock,
            time_scale,
            default_exp: self.default_exp,
            default_max_age: self.config.default_max_age,
            lru_max_size: self.config.lru_max_size.filter(|&size| size > 0),
            cleanup_interval: self
                .config
                .cleanup_interval
                .filter(|interval| !interval.is_zero()),
            expiry_bucket_size,
            get_expired: self.config.get_expired,
            delete_expired_on_get: self.config.delete_expired_on_get,
        };

        Cache::from_settings(settings, self.hooks)
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("custom_clock", &self.clock.is_some())
            .field("has_default_exp", &self.default_exp.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Default bucket width expressed in the units of a clock with `time_scale`.
fn scaled_bucket_size(time_scale: f64) -> u64 {
    let scaled = (DEFAULT_EXPIRY_BUCKET_SIZE as f64 / time_scale).round();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled as u64
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::current_timestamp_ms;

    #[test]
    fn test_builder_defaults() {
        let cache: Cache<String, i32> = CacheBuilder::new().build().unwrap();

        assert_eq!(cache.expiry_bucket_size(), DEFAULT_EXPIRY_BUCKET_SIZE);
        assert_eq!(cache.time_scale(), 1.0);
        assert!(cache.lru_max_size().is_none());
        assert!(cache.default_max_age().is_none());
        assert!(cache.cleanup_interval().is_none());
        assert!(!cache.get_expired());
        assert!(!cache.delete_expired_on_get());
    }

    #[test]
    fn test_zero_lru_size_is_unbounded() {
        let cache: Cache<String, i32> = CacheBuilder::new().lru_max_size(0).build().unwrap();
        assert!(cache.lru_max_size().is_none());
    }

    #[test]
    fn test_zero_cleanup_interval_disabled() {
        let cache: Cache<String, i32> = CacheBuilder::new()
            .cleanup_interval(Duration::ZERO)
            .build()
            .unwrap();
        assert!(cache.cleanup_interval().is_none());
    }

    #[test]
    fn test_zero_bucket_size_rejected() {
        let result: Result<Cache<String, i32>> =
            CacheBuilder::new().expiry_bucket_size(0).build();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_bucket_size_rescaled_for_custom_clock() {
        // A clock counting seconds needs a thousand times smaller windows
        let cache: Cache<String, i32> = CacheBuilder::new()
            .clock(|| current_timestamp_ms() / 1000)
            .build()
            .unwrap();

        assert!((cache.time_scale() - 1000.0).abs() < 1.0);
        assert_eq!(cache.expiry_bucket_size(), 300);
    }

    #[test]
    fn test_explicit_bucket_size_not_rescaled() {
        let cache: Cache<String, i32> = CacheBuilder::new()
            .clock(|| 5_u64)
            .expiry_bucket_size(60)
            .build()
            .unwrap();
        assert_eq!(cache.expiry_bucket_size(), 60);
    }

    #[test]
    fn test_scaled_bucket_size_never_zero() {
        assert_eq!(scaled_bucket_size(f64::INFINITY), 1);
        assert_eq!(scaled_bucket_size(1e12), 1);
        assert_eq!(scaled_bucket_size(0.5), 600_000);
    }

    #[test]
    fn test_builder_from_config() {
        let config = CacheConfig {
            lru_max_size: Some(3),
            get_expired: true,
            ..CacheConfig::default()
        };
        let cache: Cache<String, i32> = CacheBuilder::from_config(config).build().unwrap();

        assert_eq!(cache.lru_max_size(), Some(3));
        assert!(cache.get_expired());
    }
}
