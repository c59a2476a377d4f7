//! Expiry Bucket Index Module
//!
//! Groups keys by coarse expiration windows so a cleanup sweep only visits
//! windows that are already due, instead of every entry in the cache.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::cache::Timestamp;

// == Expiry Buckets ==
/// Maps `floor(exp / bucket_size)` to the keys expiring inside that window.
///
/// A key sits in exactly one bucket per tracked expiration, and empty buckets
/// are dropped as soon as their last key leaves.
#[derive(Debug)]
pub(crate) struct ExpiryBuckets<K> {
    buckets: BTreeMap<u64, HashSet<K>>,
    bucket_size: u64,
}

impl<K: Eq + Hash + Clone> ExpiryBuckets<K> {
    // == Constructor ==
    /// Creates an empty index. A zero bucket size is raised to 1.
    pub(crate) fn new(bucket_size: u64) -> Self {
        Self {
            buckets: BTreeMap::new(),
            bucket_size: bucket_size.max(1),
        }
    }

    pub(crate) fn bucket_size(&self) -> u64 {
        self.bucket_size
    }

    // == Bucket Index ==
    /// Window number a timestamp falls into.
    pub(crate) fn bucket_index(&self, timestamp: Timestamp) -> u64 {
        timestamp / self.bucket_size
    }

    // == Add ==
    /// Tracks `key` as expiring at `exp`.
    pub(crate) fn add(&mut self, key: K, exp: Timestamp) {
        let index = self.bucket_index(exp);
        self.buckets.entry(index).or_default().insert(key);
    }

    // == Remove ==
    /// Stops tracking `key` for the window of `exp`.
    ///
    /// Returns false if the key was not in that window.
    pub(crate) fn remove(&mut self, key: &K, exp: Timestamp) -> bool {
        let index = self.bucket_index(exp);
        let Some(bucket) = self.buckets.get_mut(&index) else {
            return false;
        };
        let removed = bucket.remove(key);
        if bucket.is_empty() {
            self.buckets.remove(&index);
        }
        removed
    }

    // == Relocate ==
    /// Moves `key` from the window of `old` to the window of `new`.
    ///
    /// Nothing changes when both expirations land in the same window.
    pub(crate) fn relocate(&mut self, key: &K, old: Option<Timestamp>, new: Option<Timestamp>) {
        let old_index = old.map(|exp| self.bucket_index(exp));
        let new_index = new.map(|exp| self.bucket_index(exp));
        if old_index == new_index {
            return;
        }
        if let Some(exp) = old {
            self.remove(key, exp);
        }
        if let Some(exp) = new {
            self.add(key.clone(), exp);
        }
    }

    // == Collect Expired ==
    /// Returns the keys that are due at `now`.
    ///
    /// Only windows up to the current one are scanned. Membership is coarse,
    /// so each candidate is confirmed against its live expiration through
    /// `exp_of`; keys whose entry is gone or not yet due are skipped.
    pub(crate) fn collect_expired<F>(&self, now: Timestamp, exp_of: F) -> Vec<K>
    where
        F: Fn(&K) -> Option<Timestamp>,
    {
        let current = self.bucket_index(now);
        self.buckets
            .range(..=current)
            .flat_map(|(_, bucket)| bucket.iter())
            .filter(|key| matches!(exp_of(key), Some(exp) if exp <= now))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    /// Returns true if `key` is tracked in the window of `exp`.
    pub(crate) fn contains(&self, key: &K, exp: Timestamp) -> bool {
        self.buckets
            .get(&self.bucket_index(exp))
            .is_some_and(|bucket| bucket.contains(key))
    }

    #[cfg(test)]
    /// Number of non-empty windows.
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    /// Number of tracked keys across all windows.
    pub(crate) fn key_count(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    // == Clear ==
    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
    }
}
