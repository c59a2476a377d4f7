//! Cache Store Module
//!
//! Main cache engine binding the key map, the LRU list and the expiry bucket
//! index together. Every removal path detaches an entry from all three in one
//! step, so the structures never drift apart.

use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::buckets::ExpiryBuckets;
use crate::cache::{
    CacheBuilder, CacheEntry, CacheStats, Clock, DefaultExpFn, DeleteReason, Hooks, List,
    MissReason, NodeHandle, OnDelete, OnDeleteExpired, OnGetHit, OnGetMiss, Timestamp,
};
use crate::error::Result;

// == Options ==
/// Per-call overrides for [`Cache::get_with`].
///
/// `None` falls back to the cache-level setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return expired entries instead of treating them as misses
    pub expired: Option<bool>,
    /// Delete expired entries when a lookup runs into them
    pub delete_expired: Option<bool>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expired(mut self, expired: bool) -> Self {
        self.expired = Some(expired);
        self
    }

    pub fn delete_expired(mut self, delete_expired: bool) -> Self {
        self.delete_expired = Some(delete_expired);
        self
    }
}

/// Expiration inputs for [`Cache::set_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Absolute expiration, wins over everything else
    pub exp: Option<Timestamp>,
    /// Lifetime relative to now, wins over the cache's default max age
    pub max_age: Option<u64>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exp(mut self, exp: Timestamp) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Partial change applied by [`Cache::update`].
///
/// `exp: None` leaves the expiration alone, `exp: Some(None)` clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate<V> {
    pub value: Option<V>,
    pub exp: Option<Option<Timestamp>>,
}

impl<V> EntryUpdate<V> {
    pub fn new() -> Self {
        Self {
            value: None,
            exp: None,
        }
    }

    pub fn value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    pub fn exp(mut self, exp: Timestamp) -> Self {
        self.exp = Some(Some(exp));
        self
    }

    /// Makes the entry never expire.
    pub fn clear_exp(mut self) -> Self {
        self.exp = Some(None);
        self
    }
}

impl<V> Default for EntryUpdate<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Settings ==
/// Validated construction settings, produced by [`CacheBuilder`].
pub(crate) struct CacheSettings {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) time_scale: f64,
    pub(crate) default_exp: Option<DefaultExpFn>,
    pub(crate) default_max_age: Option<u64>,
    pub(crate) lru_max_size: Option<usize>,
    pub(crate) cleanup_interval: Option<Duration>,
    pub(crate) expiry_bucket_size: u64,
    pub(crate) get_expired: bool,
    pub(crate) delete_expired_on_get: bool,
}

// == Cache ==
/// Single-threaded key/value cache with expiration and optional LRU bound.
///
/// Share it across tasks through [`crate::SharedCache`], which also owns the
/// periodic expiry sweep.
pub struct Cache<K, V> {
    /// Key-value storage
    store: HashMap<K, CacheEntry<V>>,
    /// Recency order, least recent first. Empty when LRU is disabled.
    lru: List<K>,
    /// Keys grouped by expiration window
    buckets: ExpiryBuckets<K>,
    /// Performance statistics
    stats: CacheStats,
    clock: Arc<dyn Clock>,
    time_scale: f64,
    default_exp: Option<DefaultExpFn>,
    default_max_age: Option<u64>,
    lru_max_size: Option<usize>,
    cleanup_interval: Option<Duration>,
    get_expired: bool,
    delete_expired_on_get: bool,
    hooks: Hooks<K, V>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an unbounded cache on the system clock with no expiration defaults.
    pub fn new() -> Self {
        CacheBuilder::new().build_unchecked()
    }

    /// Starts configuring a cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    pub(crate) fn from_settings(settings: CacheSettings, hooks: Hooks<K, V>) -> Self {
        Self {
            store: HashMap::new(),
            lru: List::new(),
            buckets: ExpiryBuckets::new(settings.expiry_bucket_size),
            stats: CacheStats::new(),
            clock: settings.clock,
            time_scale: settings.time_scale,
            default_exp: settings.default_exp,
            default_max_age: settings.default_max_age,
            lru_max_size: settings.lru_max_size,
            cleanup_interval: settings.cleanup_interval,
            get_expired: settings.get_expired,
            delete_expired_on_get: settings.delete_expired_on_get,
            hooks,
        }
    }

    // == Settings ==

    /// Current time according to the cache's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Ratio between the system millisecond clock and the cache's clock.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn default_max_age(&self) -> Option<u64> {
        self.default_max_age
    }

    pub fn lru_max_size(&self) -> Option<usize> {
        self.lru_max_size
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval
    }

    pub fn expiry_bucket_size(&self) -> u64 {
        self.buckets.bucket_size()
    }

    pub fn get_expired(&self) -> bool {
        self.get_expired
    }

    pub fn delete_expired_on_get(&self) -> bool {
        self.delete_expired_on_get
    }

    pub fn hooks(&self) -> &Hooks<K, V> {
        &self.hooks
    }

    pub fn set_on_get_hit(&mut self, hook: Option<OnGetHit<K, V>>) {
        self.hooks.on_get_hit = hook;
    }

    pub fn set_on_get_miss(&mut self, hook: Option<OnGetMiss<K, V>>) {
        self.hooks.on_get_miss = hook;
    }

    pub fn set_on_delete(&mut self, hook: Option<OnDelete<K, V>>) {
        self.hooks.on_delete = hook;
    }

    pub fn set_on_delete_expired(&mut self, hook: Option<OnDeleteExpired>) {
        self.hooks.on_delete_expired = hook;
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // == Has ==
    /// Returns true if `key` holds a live entry. Never touches LRU order or hooks.
    pub fn has(&self, key: &K) -> bool {
        self.has_with(key, false)
    }

    /// Like [`Cache::has`], optionally counting expired entries as present.
    pub fn has_with(&self, key: &K, include_expired: bool) -> bool {
        self.peek_with(key, include_expired).is_some()
    }

    // == Peek ==
    /// Reads a live entry without touching LRU order, hooks or statistics.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.peek_with(key, false)
    }

    /// Like [`Cache::peek`], optionally returning expired entries.
    pub fn peek_with(&self, key: &K, include_expired: bool) -> Option<&CacheEntry<V>> {
        let entry = self.store.get(key)?;
        if !include_expired && entry.is_expired_at(self.now()) {
            return None;
        }
        Some(entry)
    }

    // == Get ==
    /// Looks up `key` using the cache-level expiration policies.
    pub fn get(&mut self, key: &K) -> Option<&CacheEntry<V>> {
        self.get_with(key, GetOptions::default())
    }

    /// Looks up `key`, refreshing its recency and firing hooks.
    ///
    /// - Absent: fires `on_get_miss(Missing)`. If the hook inserted the key,
    ///   lookup continues with the inserted entry.
    /// - Live: fires `on_get_hit` and returns the entry.
    /// - Expired: deletes it when `delete_expired` applies and returns `None`;
    ///   otherwise returns it when `expired` applies; otherwise fires
    ///   `on_get_miss(Expired)` and returns whatever live entry the hook left.
    pub fn get_with(&mut self, key: &K, options: GetOptions) -> Option<&CacheEntry<V>> {
        let mut fire_hit = true;
        if !self.store.contains_key(key) {
            self.fire_get_miss(key, MissReason::Missing);
            if !self.store.contains_key(key) {
                self.stats.record_miss();
                return None;
            }
            fire_hit = false;
        }

        let now = self.now();
        let expired = self
            .store
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));

        if !expired {
            if fire_hit {
                self.fire_get_hit(key);
            }
            self.touch(key);
            return self.found(key);
        }

        if options.delete_expired.unwrap_or(self.delete_expired_on_get) {
            self.delete_with_reason(key, DeleteReason::Expired);
            self.stats.record_miss();
            return None;
        }

        if options.expired.unwrap_or(self.get_expired) {
            self.touch(key);
            return self.found(key);
        }

        self.fire_get_miss(key, MissReason::Expired);
        let now = self.now();
        let reloaded = self
            .store
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now));
        if reloaded {
            self.found(key)
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Expiration ==
    /// Resolves the expiration `set` would apply.
    ///
    /// Precedence: `exp`, then now + `max_age`, then now + the default max
    /// age, then the default expiration function, then no expiration.
    pub fn expiry_of(&self, exp: Option<Timestamp>, max_age: Option<u64>) -> Option<Timestamp> {
        exp.or_else(|| {
            max_age
                .or(self.default_max_age)
                .map(|age| self.now().saturating_add(age))
        })
        .or_else(|| self.default_exp.as_ref().and_then(|default_exp| default_exp()))
    }

    // == Set ==
    /// Stores `value` under `key` with the default expiration.
    pub fn set(&mut self, key: K, value: V) {
        self.set_with(key, value, SetOptions::default());
    }

    /// Stores `value` under `key`.
    ///
    /// An existing entry is updated in place and counts as an access. A new
    /// entry goes to the most recent end of the LRU list, and the least
    /// recently used entry is evicted if the cache is now over its bound.
    pub fn set_with(&mut self, key: K, value: V, options: SetOptions) {
        let exp = self.expiry_of(options.exp, options.max_age);

        if let Some(entry) = self.store.get_mut(&key) {
            let old_exp = entry.exp;
            let handle = entry.lru;
            entry.value = value;
            entry.exp = exp;
            if old_exp != exp {
                self.buckets.relocate(&key, old_exp, exp);
            }
            self.touch_handle(handle);
            return;
        }

        let mut entry = CacheEntry::new(value, exp);
        if let Some(exp) = exp {
            self.buckets.add(key.clone(), exp);
        }
        if self.lru_max_size.is_some() {
            entry.lru = Some(self.lru.push_back(key.clone()));
        }
        self.store.insert(key, entry);

        self.evict_overflow();
    }

    // == Update ==
    /// Changes the value and/or expiration of an existing entry.
    ///
    /// Counts as an access. Returns false, without side effects, if `key` is absent.
    pub fn update(&mut self, key: &K, update: EntryUpdate<V>) -> bool {
        let Some(entry) = self.store.get_mut(key) else {
            return false;
        };
        let handle = entry.lru;
        if let Some(value) = update.value {
            entry.value = value;
        }
        if let Some(exp) = update.exp {
            let old_exp = std::mem::replace(&mut entry.exp, exp);
            self.buckets.relocate(key, old_exp, exp);
        }
        self.touch_handle(handle);
        true
    }

    // == Delete ==
    /// Removes `key`, firing `on_delete` with [`DeleteReason::Deleted`].
    pub fn delete(&mut self, key: &K) -> bool {
        self.delete_with_reason(key, DeleteReason::Deleted)
    }

    /// Removes `key` from the store, the LRU list and the bucket index, then
    /// fires `on_delete` with `reason`.
    ///
    /// Returns false, without firing anything, if `key` is absent.
    pub fn delete_with_reason(&mut self, key: &K, reason: DeleteReason) -> bool {
        let Some((key, entry)) = self.detach(key) else {
            return false;
        };
        self.stats.record_removal(reason);
        self.fire_delete(&key, &entry, reason);
        true
    }

    // == Delete Expired ==
    /// Removes every entry whose expiration has passed.
    ///
    /// Only expiration windows that are already due get scanned. Fires
    /// `on_delete` per removed entry, then `on_delete_expired` once with the
    /// total, even when it is zero.
    pub fn delete_expired(&mut self) -> usize {
        let now = self.now();
        let store = &self.store;
        let due = self
            .buckets
            .collect_expired(now, |key| store.get(key).and_then(|entry| entry.exp));

        let mut count = 0;
        for key in due {
            // An earlier on_delete hook may have removed or refreshed this key
            let still_due = self
                .store
                .get(&key)
                .is_some_and(|entry| entry.is_expired_at(now));
            if still_due && self.delete_with_reason(&key, DeleteReason::Expired) {
                count += 1;
            }
        }

        debug!(count, remaining = self.store.len(), "Deleted expired entries");
        self.fire_delete_expired(count);
        count
    }

    // == Clear ==
    /// Empties the cache.
    ///
    /// This is a bulk reset: no `on_delete` hooks fire. Statistics counters
    /// are kept; see [`Cache::reset_stats`].
    pub fn clear(&mut self) {
        self.store.clear();
        self.lru.clear();
        self.buckets.clear();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::new();
    }

    // == Iteration ==
    /// Iterates over keys in no particular order, expired entries included.
    pub fn keys(&self) -> hash_map::Keys<'_, K, CacheEntry<V>> {
        self.store.keys()
    }

    pub fn values(&self) -> hash_map::Values<'_, K, CacheEntry<V>> {
        self.store.values()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, CacheEntry<V>> {
        self.store.iter()
    }

    /// Keys in recency order, least recently used first.
    ///
    /// Empty when LRU tracking is disabled.
    pub fn lru_keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.lru.iter()
    }

    // == Internal ==

    fn found(&mut self, key: &K) -> Option<&CacheEntry<V>> {
        let entry = self.store.get(key);
        if entry.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        entry
    }

    fn touch(&mut self, key: &K) {
        let handle = self.store.get(key).and_then(|entry| entry.lru);
        self.touch_handle(handle);
    }

    fn touch_handle(&mut self, handle: Option<NodeHandle>) {
        if let Some(handle) = handle {
            lru_invariant(self.lru.move_to_back(handle));
        }
    }

    /// Takes the entry out of all three structures.
    fn detach(&mut self, key: &K) -> Option<(K, CacheEntry<V>)> {
        let (key, mut entry) = self.store.remove_entry(key)?;
        if let Some(exp) = entry.exp {
            self.buckets.remove(&key, exp);
        }
        if let Some(handle) = entry.lru.take() {
            lru_invariant(self.lru.remove(handle));
        }
        Some((key, entry))
    }

    fn evict_overflow(&mut self) {
        let Some(max_size) = self.lru_max_size else {
            return;
        };
        while self.store.len() > max_size {
            let Some(key) = self.lru.pop_front() else {
                break;
            };
            let Some(mut entry) = self.store.remove(&key) else {
                continue;
            };
            entry.lru = None;
            if let Some(exp) = entry.exp {
                self.buckets.remove(&key, exp);
            }
            self.stats.record_removal(DeleteReason::Lru);
            debug!(max_size, "Evicted least recently used entry");
            self.fire_delete(&key, &entry, DeleteReason::Lru);
        }
    }

    fn fire_get_hit(&mut self, key: &K) {
        if let Some(hook) = self.hooks.on_get_hit.clone() {
            hook(self, key);
        }
    }

    fn fire_get_miss(&mut self, key: &K, reason: MissReason) {
        if let Some(hook) = self.hooks.on_get_miss.clone() {
            hook(self, key, reason);
        }
    }

    fn fire_delete(&mut self, key: &K, entry: &CacheEntry<V>, reason: DeleteReason) {
        if let Some(hook) = self.hooks.on_delete.clone() {
            hook(self, key, entry, reason);
        }
    }

    fn fire_delete_expired(&self, count: usize) {
        if let Some(hook) = &self.hooks.on_delete_expired {
            hook(count);
        }
    }

    /// Cross-checks the store, the LRU list and the bucket index.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        if self.lru_max_size.is_some() {
            assert_eq!(self.lru.len(), self.store.len(), "LRU list size");
            for (key, entry) in &self.store {
                let handle = entry.lru.expect("entry without LRU node");
                assert!(self.lru.get(handle) == Some(key), "LRU node holds another key");
            }
        } else {
            assert!(self.lru.is_empty());
        }

        let expiring = self.store.values().filter(|entry| entry.exp.is_some()).count();
        assert_eq!(self.buckets.key_count(), expiring, "bucket membership count");
        for (key, entry) in &self.store {
            if let Some(exp) = entry.exp {
                assert!(self.buckets.contains(key, exp), "entry missing from its bucket");
            }
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.store.len())
            .field("lru_max_size", &self.lru_max_size)
            .field("default_max_age", &self.default_max_age)
            .field("expiry_bucket_size", &self.buckets.bucket_size())
            .field("cleanup_interval", &self.cleanup_interval)
            .field("get_expired", &self.get_expired)
            .field("delete_expired_on_get", &self.delete_expired_on_get)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> IntoIterator for &'a Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = (&'a K, &'a CacheEntry<V>);
    type IntoIter = hash_map::Iter<'a, K, CacheEntry<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Every entry's LRU handle is issued by this cache's own list, so a failure
/// here means the two have drifted apart.
fn lru_invariant<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("LRU list out of sync with the store: {}", err),
    }
}
