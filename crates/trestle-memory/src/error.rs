//! Error types for the memory crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the memory crate.
///
/// Only infrastructure problems surface as errors. Missing categories or keys
/// are ordinary outcomes and are reported through return values instead.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The scope identifier cannot be used to name a store.
    #[error("Invalid scope identifier: {0}")]
    InvalidScope(String),

    /// A required argument was empty or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Durable storage could not be written.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Serialization failed while persisting a store.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The exclusive scope lock could not be acquired in time.
    #[error("Storage unavailable: scope '{scope}' stayed locked for {waited:?}")]
    LockTimeout {
        /// Scope whose lock was contended.
        scope: String,
        /// How long the caller waited.
        waited: Duration,
    },
}

impl MemoryError {
    /// Create a storage error for the given path.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
