//! Expiry Cleanup Task
//!
//! Background task that periodically removes expired cache entries, and the
//! start/stop handle that owns it.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::error::{CacheError, Result};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between sweeps.
/// The write lock is only held for the duration of one `delete_expired` call,
/// so aborting the task never leaves the cache half-swept.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(Cache::<String, String>::new()));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(
    cache: Arc<RwLock<Cache<K, V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting expiry cleanup task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.delete_expired()
            };

            if removed > 0 {
                info!("Expiry cleanup: removed {} expired entries", removed);
            } else {
                debug!("Expiry cleanup: no expired entries found");
            }
        }
    })
}

// == Cleanup Task ==
/// Owns the periodic sweep of one cache.
///
/// At most one sweep runs at a time. Dropping the handle stops the sweep.
#[derive(Debug, Default)]
pub struct CleanupTask {
    handle: Option<JoinHandle<()>>,
    interval: Option<Duration>,
}

impl CleanupTask {
    /// Creates a stopped task that will use `interval` once started.
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            handle: None,
            interval,
        }
    }

    /// The interval the next start will use when none is supplied.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    // == Start ==
    /// Starts sweeping `cache` every `interval` (or the remembered interval).
    ///
    /// Returns `Ok(false)` without doing anything if a sweep is already running
    /// and `restart` is false. With `restart` the running sweep is replaced.
    /// A missing or zero interval disables sweeping and also returns `Ok(false)`.
    ///
    /// # Errors
    /// [`CacheError::Runtime`] when called outside a Tokio runtime.
    pub fn start<K, V>(
        &mut self,
        cache: &Arc<RwLock<Cache<K, V>>>,
        interval: Option<Duration>,
        restart: bool,
    ) -> Result<bool>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        if self.is_running() {
            if !restart {
                return Ok(false);
            }
            self.stop();
        }

        if interval.is_some() {
            self.interval = interval;
        }
        let Some(interval) = self.interval.filter(|interval| !interval.is_zero()) else {
            return Ok(false);
        };

        Handle::try_current().map_err(|err| CacheError::Runtime(err.to_string()))?;
        self.handle = Some(spawn_cleanup_task(cache.clone(), interval));
        Ok(true)
    }

    // == Stop ==
    /// Cancels the sweep. Returns whether one was scheduled.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                info!("Expiry cleanup task stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
