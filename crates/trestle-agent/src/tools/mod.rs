//! Built-in tools for Trestle agents.
//!
//! - Memory: `remember`, `recall`, `search_memory`, `clear_memory`
//! - Components: register, update, look up, list and resolve references
//! - Delegation from the triage agent to worker agents

mod component;
mod delegate;
mod memory;

use std::sync::Arc;

use trestle_memory::ScopedMemory;
use trestle_registry::{ComponentRegistry, SyncHook};

use crate::tool::ToolRegistry;

// Memory tools
pub use memory::{ClearMemoryTool, RecallTool, RememberParams, RememberTool, SearchMemoryTool};

// Component tools
pub use component::{
    FindComponentsTool, GetComponentTool, NewComponentParams, RegisterComponentTool,
    ResolveReferenceTool, UpdateComponentTool,
};

// Delegate tool
pub use delegate::{AgentRole, DelegateTool, DelegationOutcome, SharedDispatcher, WorkerDispatcher};

/// Register the memory and component tools for one session.
///
/// The delegate tool is not included; only the triage agent gets it.
pub fn register_session_tools<S: SyncHook + 'static>(
    tools: &mut ToolRegistry,
    memory: &ScopedMemory,
    components: &Arc<ComponentRegistry<S>>,
) {
    tools.register(RememberTool::new(memory.clone()));
    tools.register(RecallTool::new(memory.clone()));
    tools.register(SearchMemoryTool::new(memory.clone()));
    tools.register(ClearMemoryTool::new(memory.clone()));

    tools.register(RegisterComponentTool::new(Arc::clone(components)));
    tools.register(UpdateComponentTool::new(Arc::clone(components)));
    tools.register(GetComponentTool::new(Arc::clone(components)));
    tools.register(FindComponentsTool::new(Arc::clone(components)));
    tools.register(ResolveReferenceTool::new(Arc::clone(components)));
}
