//! Durable, session-scoped key-value memory.
//!
//! Facts are addressed by `(scope, category, key)` and persisted as one JSON
//! document per scope. Every write lands on disk before it returns, so a later
//! process (or a freshly constructed store) sees it.
//!
//! This crate provides:
//! - A typed API on [`ScopedMemory`] (`put`, `get`, `entries`, `search`, `clear`)
//! - Text operations for tool calls (`remember`, `recall`, `search_memory`,
//!   `clear_memory`) that never fail on lookups
//! - Cross-process safety via per-scope exclusive file locks and atomic
//!   replace-on-write
//! - Explicit retention (`list_sessions`, `prune_older_than`)
//!
//! # Example
//!
//! ```rust,ignore
//! use trestle_memory::{MemoryStore, StoreConfig};
//!
//! let store = MemoryStore::new(StoreConfig::new("/var/lib/trestle/memory"));
//! let memory = store.scope("bridge-42")?;
//! memory.remember("design", "span", "120 m")?;
//! assert_eq!(memory.recall(Some("design"), Some("span")), "120 m");
//! ```

mod config;
mod error;
mod lock;
mod render;
mod scope;
mod store;
mod types;

pub use config::{
    DEFAULT_DIGEST_PREVIEW_ITEMS, DEFAULT_LOCK_TIMEOUT, DEFAULT_PREVIEW_CHARS, DEFAULT_RECALL_LIMIT,
    DEFAULT_SEARCH_LIMIT, StoreConfig,
};
pub use error::{MemoryError, Result};
pub use render::{AFFIRMATIVE_TOKENS, is_affirmative};
pub use scope::Scope;
pub use store::{MemoryStore, ScopedMemory};
pub use types::{
    CategoryRecords, ClearOutcome, MemoryDocument, MemoryRecord, PruneReport, SearchHit,
    SessionInfo,
};
