//! Lifecycle Hooks Module
//!
//! Callbacks fired synchronously from inside cache operations. Hooks receive
//! the cache itself, so they may read or write it (for example to load a
//! missing key). A panicking hook aborts the operation that fired it.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{Cache, CacheEntry, Timestamp};

// == Delete Reason ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeleteReason {
    /// Evicted to keep the cache within its LRU bound
    #[serde(rename = "LRU")]
    Lru,
    /// Removed after its expiration passed
    #[serde(rename = "expired")]
    Expired,
    /// Removed explicitly by a caller
    #[serde(rename = "deleted")]
    Deleted,
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteReason::Lru => write!(f, "LRU"),
            DeleteReason::Expired => write!(f, "expired"),
            DeleteReason::Deleted => write!(f, "deleted"),
        }
    }
}

// == Miss Reason ==
/// Why a lookup found nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MissReason {
    #[serde(rename = "missing")]
    Missing,
    #[serde(rename = "expired")]
    Expired,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::Missing => write!(f, "missing"),
            MissReason::Expired => write!(f, "expired"),
        }
    }
}

// == Hook Types ==
/// Fired when `get` finds a live entry.
pub type OnGetHit<K, V> = Arc<dyn Fn(&mut Cache<K, V>, &K) + Send + Sync>;

/// Fired when `get` finds no entry or only an expired one. The hook may insert
/// the key; `get` then returns the inserted entry.
pub type OnGetMiss<K, V> = Arc<dyn Fn(&mut Cache<K, V>, &K, MissReason) + Send + Sync>;

/// Fired once per removed entry, after it has been detached from the cache.
pub type OnDelete<K, V> =
    Arc<dyn Fn(&mut Cache<K, V>, &K, &CacheEntry<V>, DeleteReason) + Send + Sync>;

/// Fired once per `delete_expired` sweep with the number of removed entries.
pub type OnDeleteExpired = Arc<dyn Fn(usize) + Send + Sync>;

/// Expiration applied when neither `set` nor the max-age settings supply one.
pub type DefaultExpFn = Arc<dyn Fn() -> Option<Timestamp> + Send + Sync>;

// == Hooks ==
/// The four optional lifecycle hooks of a cache.
pub struct Hooks<K, V> {
    pub on_get_hit: Option<OnGetHit<K, V>>,
    pub on_get_miss: Option<OnGetMiss<K, V>>,
    pub on_delete: Option<OnDelete<K, V>>,
    pub on_delete_expired: Option<OnDeleteExpired>,
}

impl<K, V> Default for Hooks<K, V> {
    fn default() -> Self {
        Self {
            on_get_hit: None,
            on_get_miss: None,
            on_delete: None,
            on_delete_expired: None,
        }
    }
}

impl<K, V> Clone for Hooks<K, V> {
    fn clone(&self) -> Self {
        Self {
            on_get_hit: self.on_get_hit.clone(),
            on_get_miss: self.on_get_miss.clone(),
            on_delete: self.on_delete.clone(),
            on_delete_expired: self.on_delete_expired.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Hooks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_get_hit", &self.on_get_hit.is_some())
            .field("on_get_miss", &self.on_get_miss.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_delete_expired", &self.on_delete_expired.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels() {
        assert_eq!(DeleteReason::Lru.to_string(), "LRU");
        assert_eq!(DeleteReason::Expired.to_string(), "expired");
        assert_eq!(DeleteReason::Deleted.to_string(), "deleted");
        assert_eq!(MissReason::Missing.to_string(), "missing");
        assert_eq!(
            serde_json::to_string(&DeleteReason::Lru).unwrap(),
            "\"LRU\""
        );
    }

    #[test]
    fn test_hooks_debug_shows_presence() {
        let mut hooks: Hooks<String, i32> = Hooks::default();
        hooks.on_delete_expired = Some(Arc::new(|_| {}));

        let debug = format!("{:?}", hooks);
        assert!(debug.contains("on_delete_expired: true"));
        assert!(debug.contains("on_get_hit: false"));
    }
}
