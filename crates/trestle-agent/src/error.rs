//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for agent operations.
///
/// Tools return these only for infrastructure failures. Anything the model
/// can act on is reported as a [`ToolResult`](crate::ToolResult) instead.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Tool execution error.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid tool parameters.
    #[error("Invalid tool parameters: {0}")]
    InvalidToolParams(String),

    /// Durable memory failure.
    #[error("Memory error: {0}")]
    Memory(#[from] trestle_memory::MemoryError),

    /// Component registry failure.
    #[error("Registry error: {0}")]
    Registry(#[from] trestle_registry::RegistryError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Task was cancelled.
    #[error("Task cancelled")]
    Cancelled,
}

impl AgentError {
    /// Create a tool error.
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<tokio::task::JoinError> for AgentError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
