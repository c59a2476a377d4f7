//! Clock Module
//!
//! Pluggable time sources for expiration. The cache only ever asks a clock
//! for "now"; the unit is whatever the clock counts in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::cache::Timestamp;

// == Clock Trait ==
/// A source of the current time.
///
/// Any `Fn() -> Timestamp` closure is a clock as well.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<F> Clock for F
where
    F: Fn() -> Timestamp + Send + Sync,
{
    fn now(&self) -> Timestamp {
        self()
    }
}

// == System Clock ==
/// Wall clock reporting Unix milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        current_timestamp_ms()
    }
}

// == Manual Clock ==
/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the cache
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, by: u64) -> Timestamp {
        self.now.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> Timestamp {
    Utc::now().timestamp_millis().max(0) as Timestamp
}

/// Ratio between the system millisecond clock and `clock`.
///
/// A clock reporting zero is treated as reporting 1 so the ratio stays finite.
pub fn time_scale(clock: &dyn Clock) -> f64 {
    current_timestamp_ms() as f64 / clock.now().max(1) as f64
}
