//! Cache Module
//!
//! Provides the in-process cache engine with expiry buckets, LRU eviction
//! and lifecycle hooks, plus the linked list it is built on.

mod buckets;
mod builder;
mod clock;
mod entry;
mod hooks;
mod list;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use builder::CacheBuilder;
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Timestamp};
pub use hooks::{
    DefaultExpFn, DeleteReason, Hooks, MissReason, OnDelete, OnDeleteExpired, OnGetHit,
    OnGetMiss,
};
pub use list::{Handles, IntoIter, Iter, List, NodeHandle};
pub use stats::CacheStats;
pub use store::{Cache, EntryUpdate, GetOptions, SetOptions};

// == Public Constants ==
/// Default expiration window width, in system clock milliseconds (5 minutes)
pub const DEFAULT_EXPIRY_BUCKET_SIZE: u64 = 300_000;
