//! Component registry for conversational CAD sessions.
//!
//! Tracks the components created during a design session and resolves vague
//! references ("it", "the curve", "all the beams") to concrete ids.
//!
//! This crate provides:
//! - [`ComponentRegistry`]: thread-safe index with recency ordering and
//!   type-filtered lookup
//! - [`resolve`]: the pure reference-resolution heuristic
//! - [`SyncHook`]: seam through which every mutation is mirrored into
//!   durable storage before it is committed
//! - [`ComponentSummary`]: the one-line text form used for that mirror, and
//!   [`recover_components`] to rebuild an index from it
//!
//! # Example
//!
//! ```rust,ignore
//! use trestle_registry::{ComponentRegistry, NewComponent, RegistryConfig};
//!
//! let registry = ComponentRegistry::new(RegistryConfig::default());
//! registry.register(NewComponent::new("curve_001", "curve", "Bridge Arch", "main bridge arch"))?;
//! assert_eq!(registry.resolve_reference("modify the curve you just drew"), vec!["curve_001"]);
//! ```

mod component;
mod config;
mod error;
mod hook;
mod registry;
pub mod resolve;
mod summary;

pub use component::{Component, ComponentUpdate, NewComponent, Properties};
pub use config::{DEFAULT_PLURAL_REFERENCE_LIMIT, RegistryConfig};
pub use error::{RegistryError, Result};
pub use hook::{NoSync, SyncHook};
pub use registry::ComponentRegistry;
pub use resolve::{MatchRule, Resolution};
pub use summary::{ComponentSummary, recover_components};
