//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Absence is never an error here: lookups return `Option`, and mutations
//! that require an existing key return `bool`. The only hard failures are
//! malformed snapshot payloads on restore.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Snapshot payload failed validation on restore
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
