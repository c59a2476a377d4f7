//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and its supporting structures.
///
/// Missing keys are not errors: lookups report them as `None` or `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A list node handle that does not belong to the list it was used with,
    /// or whose node has already been removed
    #[error("Invalid list node handle")]
    InvalidHandle,

    /// Construction settings that cannot produce a working cache
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A background task was requested without an async runtime available
    #[error("Runtime error: {0}")]
    Runtime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
