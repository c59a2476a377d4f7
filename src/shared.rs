//! Shared Cache Module
//!
//! A [`Cache`] behind an async lock, together with the periodic sweep that
//! keeps it free of expired entries. Each public cache operation runs as one
//! critical section under the write (or read) lock.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use crate::cache::Cache;
use crate::error::Result;
use crate::tasks::CleanupTask;

// == Shared Cache ==
/// Thread-safe handle to a cache and its cleanup task.
///
/// The cleanup task lives and dies with this value.
#[derive(Debug)]
pub struct SharedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    cache: Arc<RwLock<Cache<K, V>>>,
    cleanup: CleanupTask,
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Wraps `cache` and starts its cleanup sweep if it has an interval.
    ///
    /// Outside a Tokio runtime the sweep stays off (a warning is logged) and can
    /// be started later with [`SharedCache::start_cleanup_interval`].
    pub fn new(cache: Cache<K, V>) -> Self {
        let interval = cache.cleanup_interval();
        let mut shared = Self {
            cache: Arc::new(RwLock::new(cache)),
            cleanup: CleanupTask::new(interval),
        };
        if let Err(err) = shared.start_cleanup_interval(None) {
            warn!("Expiry cleanup not started: {}", err);
        }
        shared
    }

    /// Another reference to the locked cache, e.g. for handing to other tasks.
    pub fn handle(&self) -> Arc<RwLock<Cache<K, V>>> {
        self.cache.clone()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Cache<K, V>> {
        self.cache.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Cache<K, V>> {
        self.cache.write().await
    }

    /// Runs one expiry sweep right away.
    pub async fn delete_expired(&self) -> usize {
        self.cache.write().await.delete_expired()
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    // == Cleanup Interval ==

    /// Starts the periodic sweep. No-op returning false if it is already running.
    pub fn start_cleanup_interval(&mut self, interval: Option<Duration>) -> Result<bool> {
        self.cleanup.start(&self.cache, interval, false)
    }

    /// Replaces any running sweep with one using `interval` or the previous interval.
    pub fn restart_cleanup_interval(&mut self, interval: Option<Duration>) -> Result<bool> {
        self.cleanup.start(&self.cache, interval, true)
    }

    /// Cancels the sweep. Returns whether one was scheduled.
    pub fn stop_cleanup_interval(&mut self) -> bool {
        self.cleanup.stop()
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup.is_running()
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.cleanup.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, SetOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_shared_cache_starts_configured_cleanup() {
        let clock = ManualClock::new(0);
        let sweeps = Arc::new(AtomicUsize::new(0));
        let counter = sweeps.clone();
        let cache = Cache::<String, i32>::builder()
            .clock(clock.clone())
            .expiry_bucket_size(100)
            .cleanup_interval(Duration::from_millis(100))
            .on_delete_expired(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let mut shared = SharedCache::new(cache);
        assert!(shared.is_cleanup_running());

        shared
            .write()
            .await
            .set_with("a".to_string(), 1, SetOptions::new().exp(50));
        clock.set(60);
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(shared.is_empty().await);
        assert!(sweeps.load(Ordering::SeqCst) >= 3);

        assert!(shared.stop_cleanup_interval());
        let seen = sweeps.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), seen, "no sweeps after stop");
    }

    #[tokio::test]
    async fn test_shared_cache_without_interval() {
        let mut shared = SharedCache::new(Cache::<String, i32>::new());

        assert!(!shared.is_cleanup_running());
        assert!(!shared.stop_cleanup_interval());
        assert!(shared.start_cleanup_interval(Some(Duration::from_secs(1))).unwrap());
        assert!(!shared.start_cleanup_interval(None).unwrap());
        assert!(shared.restart_cleanup_interval(None).unwrap());
        assert_eq!(shared.cleanup_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_shared_cache_outside_runtime() {
        let cache = Cache::<String, i32>::builder()
            .cleanup_interval(Duration::from_secs(1))
            .build()
            .unwrap();

        let shared = SharedCache::new(cache);

        assert!(!shared.is_cleanup_running());
    }
}
