//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses and removals.

use serde::Serialize;

use crate::cache::DeleteReason;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that returned an entry
    pub hits: u64,
    /// Number of lookups that returned nothing
    pub misses: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Number of entries removed because they expired
    pub expirations: u64,
    /// Number of entries removed explicitly
    pub deletions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Removal ==
    /// Increments the counter matching why an entry left the cache.
    pub fn record_removal(&mut self, reason: DeleteReason) {
        match reason {
            DeleteReason::Lru => self.evictions += 1,
            DeleteReason::Expired => self.expirations += 1,
            DeleteReason::Deleted => self.deletions += 1,
        }
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
