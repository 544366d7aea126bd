//! Mirroring of registry mutations into durable memory.
//!
//! Every register or update writes `components/<id>` in the session's memory
//! scope, with the component's one-line summary as the value. A fresh process
//! can then find components by plain memory search, or rebuild an approximate
//! registry with [`recover_registry`].

use trestle_memory::ScopedMemory;
use trestle_registry::{
    Component, ComponentRegistry, RegistryConfig, RegistryError, SyncHook, recover_components,
};
use tracing::{debug, info};

/// Memory category holding component summaries.
pub const COMPONENTS_CATEGORY: &str = "components";

/// [`SyncHook`] that writes component summaries into a memory scope.
#[derive(Debug, Clone)]
pub struct MemorySync {
    memory: ScopedMemory,
}

impl MemorySync {
    pub fn new(memory: ScopedMemory) -> Self {
        Self { memory }
    }

    /// The scope summaries are written to.
    pub fn memory(&self) -> &ScopedMemory {
        &self.memory
    }
}

impl SyncHook for MemorySync {
    fn sync(&self, component: &Component) -> trestle_registry::Result<()> {
        let summary = component.summary().render();
        self.memory
            .put(COMPONENTS_CATEGORY, &component.id, &summary)
            .map_err(|e| RegistryError::Sync(e.to_string()))?;
        debug!(
            scope = %self.memory.scope(),
            component_id = %component.id,
            "Component summary synced to memory"
        );
        Ok(())
    }
}

/// Components recoverable from a memory scope, oldest first.
pub fn recovered_components(memory: &ScopedMemory) -> Vec<Component> {
    let entries = memory.entries(COMPONENTS_CATEGORY);
    recover_components(
        entries
            .iter()
            .map(|(id, record)| (id.as_str(), record.value.as_str(), record.timestamp)),
    )
}

/// Build a memory-backed registry, seeded from what the scope already holds.
///
/// Recovered components carry no properties, and their timestamps are the
/// times their summaries were last written.
pub fn recover_registry(
    memory: ScopedMemory,
    config: RegistryConfig,
) -> ComponentRegistry<MemorySync> {
    let components = recovered_components(&memory);
    let registry = ComponentRegistry::with_hook(config, MemorySync::new(memory));
    let restored = registry.restore(components);
    if restored > 0 {
        info!(
            scope = %registry.hook().memory().scope(),
            restored,
            "Component registry recovered from memory"
        );
    }
    registry
}
