//! The component registry.

use chrono::Utc;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::component::{Component, ComponentUpdate, NewComponent};
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::hook::{NoSync, SyncHook};
use crate::resolve::{self, Resolution};

/// In-process index of components with recency tracking.
///
/// Components are kept in an unbounded LRU list: registering or updating a
/// component makes it the most recent, and nothing is ever evicted. Lookups
/// and resolution do not change recency.
///
/// All operations take a single mutex. Mutations call the sync hook while
/// holding it, so a component is committed to the index only after it has
/// been mirrored, and two callers can never register the same id.
///
/// Share one registry between agents by wrapping it in an `Arc`.
pub struct ComponentRegistry<S: SyncHook = NoSync> {
    components: Mutex<LruCache<String, Component>>,
    hook: S,
    config: RegistryConfig,
}

impl<S: SyncHook> std::fmt::Debug for ComponentRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("len", &self.components.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ComponentRegistry<NoSync> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ComponentRegistry<NoSync> {
    /// Create a registry that mirrors nothing.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_hook(config, NoSync)
    }
}

impl<S: SyncHook> ComponentRegistry<S> {
    /// Create a registry that mirrors every mutation through `hook`.
    pub fn with_hook(config: RegistryConfig, hook: S) -> Self {
        Self {
            components: Mutex::new(LruCache::unbounded()),
            hook,
            config,
        }
    }

    /// The registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The sync hook.
    pub fn hook(&self) -> &S {
        &self.hook
    }

    /// Register a new component.
    ///
    /// Returns `Ok(false)` without side effects when the id is empty, carries
    /// surrounding whitespace, or is already registered. Returns an error, again without side effects, when
    /// the hook fails.
    pub fn register(&self, new: NewComponent) -> Result<bool> {
        let mut components = self.components.lock();
        if new.id.trim().is_empty() {
            debug!("Rejected component with empty id");
            return Ok(false);
        }
        // Memory keys are trimmed, so the id must already be in that form.
        if new.id.trim() != new.id {
            debug!(component_id = ?new.id, "Rejected component id with surrounding whitespace");
            return Ok(false);
        }
        if components.contains(&new.id) {
            debug!(component_id = %new.id, "Rejected duplicate component id");
            return Ok(false);
        }

        let component = new.into_component(Utc::now());
        if let Err(e) = self.hook.sync(&component) {
            warn!(component_id = %component.id, error = %e, "Component registration not synced");
            return Err(e);
        }

        info!(
            component_id = %component.id,
            component_type = %component.component_type,
            "Component registered"
        );
        components.put(component.id.clone(), component);
        Ok(true)
    }

    /// Apply `update` to an existing component and make it the most recent.
    ///
    /// Returns `Ok(false)` when the id is unknown.
    pub fn update(&self, id: &str, update: ComponentUpdate) -> Result<bool> {
        let mut components = self.components.lock();
        let Some(current) = components.peek(id) else {
            debug!(component_id = id, "Update for unknown component");
            return Ok(false);
        };

        let mut next = current.clone();
        next.apply(update);
        if let Err(e) = self.hook.sync(&next) {
            warn!(component_id = id, error = %e, "Component update not synced");
            return Err(e);
        }

        debug!(component_id = id, "Component updated");
        components.put(next.id.clone(), next);
        Ok(true)
    }

    /// Look up a component by id.
    pub fn get(&self, id: &str) -> Option<Component> {
        self.components.lock().peek(id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.components.lock().contains(id)
    }

    /// Ids of every component of exactly `component_type`, most recent first.
    pub fn find_by_type(&self, component_type: &str) -> Vec<String> {
        self.components
            .lock()
            .iter()
            .filter(|(_, c)| c.component_type == component_type)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Up to `limit` ids, most recent first.
    pub fn find_recent(&self, limit: usize) -> Vec<String> {
        self.components
            .lock()
            .iter()
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Resolve a vague reference to component ids. See [`crate::resolve`].
    pub fn resolve_reference(&self, text: &str) -> Vec<String> {
        let components = self.components.lock();
        let recent: Vec<&Component> = components.iter().map(|(_, c)| c).collect();
        resolve::resolve_reference(text, &recent, self.config.plural_reference_limit)
    }

    /// Resolve a vague reference and report the rule behind each id.
    pub fn resolve_detailed(&self, text: &str) -> Vec<Resolution> {
        let components = self.components.lock();
        let recent: Vec<&Component> = components.iter().map(|(_, c)| c).collect();
        resolve::resolve_detailed(text, &recent, self.config.plural_reference_limit)
    }

    /// Every component, most recent first.
    pub fn components(&self) -> Vec<Component> {
        self.components
            .lock()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.components.lock().is_empty()
    }

    /// Remove every component. Not mirrored through the hook.
    pub fn clear(&self) -> usize {
        let mut components = self.components.lock();
        let removed = components.len();
        components.clear();
        info!(removed, "Component registry cleared");
        removed
    }

    /// Seed the index with previously mirrored components.
    ///
    /// `components` is taken oldest first, so the last one becomes the most
    /// recent. Ids already present are skipped. Nothing is passed to the hook.
    pub fn restore(&self, components: impl IntoIterator<Item = Component>) -> usize {
        let mut index = self.components.lock();
        let mut restored = 0;
        for component in components {
            if component.id.is_empty() || index.contains(&component.id) {
                continue;
            }
            index.put(component.id.clone(), component);
            restored += 1;
        }
        debug!(restored, "Components restored");
        restored
    }
}
