//! Agent boundary for Trestle.
//!
//! Joins the memory store and the component registry into the tool surface
//! an LLM agent runtime sees, and carries the context a triage agent passes
//! to its workers.
//!
//! ```text
//!            triage agent                       worker agent
//!                 │ delegate                          │ register_component
//!                 ▼                                   ▼
//!        ┌────────────────┐   resolve    ┌──────────────────────┐
//!        │  TaskEnricher  │─────────────▶│  ComponentRegistry   │
//!        └────────────────┘              └──────────────────────┘
//!                 │ search                            │ MemorySync
//!                 ▼                                   ▼
//!        ┌──────────────────────────────────────────────────────┐
//!        │                ScopedMemory (one JSON file)          │
//!        └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Components
//!
//! - [`Tool`], [`ToolRegistry`]: the tool framework
//! - [`MemorySync`]: mirrors registry mutations into the `components` category
//! - [`TaskEnricher`]: builds an [`EnrichedTask`] for a worker
//! - [`tools`]: memory, component and delegate tools

pub mod enrich;
pub mod error;
pub mod history;
pub mod sync;
pub mod tool;
pub mod tools;
pub mod types;

pub use error::{AgentError, Result};
pub use types::{SessionId, TurnId};

// Re-export tool types
pub use tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolDefinition,
    ToolRegistry, ToolResult,
};

pub use enrich::{
    DEFAULT_HISTORY_TURNS, DEFAULT_MEMORY_HITS, DelegationConfig, EnrichedTask, TaskEnricher,
};
pub use history::{ConversationHistory, DEFAULT_HISTORY_CAPACITY, HistoryTurn, Speaker};
pub use sync::{COMPONENTS_CATEGORY, MemorySync, recover_registry, recovered_components};
