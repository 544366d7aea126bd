//! Error types for the component registry.

/// Error type for registry operations.
///
/// Bad input never produces an error: duplicate or unknown ids are reported
/// through `bool` and `Option` returns. Only the sync hook can fail.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Mirroring a component into durable storage failed.
    #[error("Component sync failed: {0}")]
    Sync(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
