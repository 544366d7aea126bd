//! CLI command handlers.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use trestle_agent::{MemorySync, recover_registry};
use trestle_config::LoadedConfig;
use trestle_memory::{MemoryStore, ScopedMemory, StoreConfig};
use trestle_registry::{ComponentRegistry, RegistryConfig};

pub mod components;
pub mod config;
pub mod memory;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Discovered configuration.
    pub loaded: LoadedConfig,
    /// Memory directory after flag, env and config resolution.
    pub memory_dir: PathBuf,
    /// Scope after flag, env and config resolution.
    pub scope: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The memory store described by the configuration.
    pub fn store(&self) -> MemoryStore {
        let section = self.loaded.config.memory();
        MemoryStore::new(
            StoreConfig::new(&self.memory_dir)
                .with_search_limit(section.search_limit)
                .with_recall_limit(section.recall_limit)
                .with_digest_preview_items(section.digest_preview_items)
                .with_preview_chars(section.preview_chars)
                .with_lock_timeout(section.lock_timeout()),
        )
    }

    /// The selected memory scope.
    pub fn memory(&self) -> Result<ScopedMemory> {
        self.store()
            .scope(self.scope.as_str())
            .with_context(|| format!("cannot open memory scope '{}'", self.scope))
    }

    /// A registry rebuilt from the scope's component summaries.
    pub fn registry(&self) -> Result<ComponentRegistry<MemorySync>> {
        let config = RegistryConfig::default()
            .with_plural_reference_limit(self.loaded.config.registry().plural_reference_limit);
        Ok(recover_registry(self.memory()?, config))
    }

    /// Print `value` as pretty JSON.
    pub fn print_json(&self, value: &impl serde::Serialize) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
