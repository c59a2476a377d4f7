//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with expiration support.

use crate::cache::NodeHandle;

/// Absolute point in time, in the units of the cache's clock.
pub type Timestamp = u64;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp in clock units, None = no expiration
    pub exp: Option<Timestamp>,
    /// Position in the LRU list, only set while LRU tracking is enabled
    pub(crate) lru: Option<NodeHandle>,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, exp: Option<Timestamp>) -> Self {
        Self {
            value,
            exp,
            lru: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches its
    /// expiration, so `exp == now` already counts as expired.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.exp {
            Some(exp) => exp <= now,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime at `now` in clock units.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining)` if the entry has an expiration that hasn't passed
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now: Timestamp) -> Option<u64> {
        self.exp.map(|exp| exp.saturating_sub(now))
    }

    /// Handle of this entry's node in the LRU list.
    pub fn lru_handle(&self) -> Option<NodeHandle> {
        self.lru
    }
}
