//! Bucket Cache - A fast in-process key/value cache
//!
//! Provides TTL expiration grouped into expiry buckets, optional LRU
//! eviction bounded by entry count, and synchronous lifecycle hooks.

pub mod cache;
pub mod config;
pub mod error;
pub mod shared;
pub mod tasks;

pub use cache::{
    Cache, CacheBuilder, CacheEntry, CacheStats, Clock, DeleteReason, EntryUpdate, GetOptions,
    List, ManualClock, MissReason, NodeHandle, SetOptions, SystemClock, Timestamp,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use shared::SharedCache;
pub use tasks::{spawn_cleanup_task, CleanupTask};
