//! File-backed memory store.
//!
//! One JSON document per scope lives under the configured directory. A scope
//! is loaded lazily on first access and cached for the life of the store.
//!
//! # Consistency
//!
//! - Mutations take the slot's write lock, then the scope's exclusive file
//!   lock, re-read the document from disk, apply the change to that fresh copy,
//!   and persist it by writing a temp file and renaming it over the original.
//!   The cached copy is replaced only after the rename succeeds.
//! - Reads never take the file lock. Because files are replaced atomically a
//!   reader sees either the previous or the next document. The cached copy is
//!   refreshed when the file's modification fingerprint no longer matches.

mod ops;
mod retention;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{MemoryError, Result};
use crate::lock::ScopeLock;
use crate::scope::Scope;
use crate::types::MemoryDocument;

pub use ops::ScopedMemory;

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Durable, scope-partitioned key-value memory.
///
/// Cloning is cheap and clones share the same scope cache.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    slots: Mutex<HashMap<String, Arc<ScopeSlot>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("directory", &self.inner.config.directory)
            .field("cached_scopes", &self.inner.slots.lock().len())
            .finish()
    }
}

impl MemoryStore {
    /// Create a store with the given configuration.
    ///
    /// Nothing touches the filesystem until a scope is first written.
    pub fn new(config: StoreConfig) -> Self {
        info!(directory = %config.directory.display(), "Memory store configured");
        Self {
            inner: Arc::new(StoreInner {
                config,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a store rooted at `directory` with default limits.
    pub fn open(directory: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(directory))
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The storage directory.
    pub fn directory(&self) -> &Path {
        &self.inner.config.directory
    }

    /// Get a handle bound to one scope.
    pub fn scope(&self, id: impl Into<String>) -> Result<ScopedMemory> {
        let scope = Scope::new(id)?;
        let slot = {
            let mut slots = self.inner.slots.lock();
            Arc::clone(
                slots
                    .entry(scope.id().to_string())
                    .or_insert_with(|| Arc::new(ScopeSlot::new(scope, &self.inner.config.directory))),
            )
        };
        Ok(ScopedMemory::new(self.clone(), slot))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scope Slot
// ─────────────────────────────────────────────────────────────────────────────

/// Cached state for one scope.
pub(crate) struct ScopeSlot {
    scope: Scope,
    data_path: PathBuf,
    lock_path: PathBuf,
    state: RwLock<SlotState>,
}

#[derive(Default)]
struct SlotState {
    loaded: bool,
    fingerprint: Option<Fingerprint>,
    document: MemoryDocument,
}

/// Cheap identity of a file version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl ScopeSlot {
    fn new(scope: Scope, root: &Path) -> Self {
        Self {
            data_path: scope.data_path(root),
            lock_path: scope.lock_path(root),
            state: RwLock::new(SlotState {
                document: MemoryDocument::new(scope.id()),
                ..SlotState::default()
            }),
            scope,
        }
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Run `f` against an up-to-date view of the document.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&MemoryDocument) -> R) -> R {
        let current = fingerprint(&self.data_path);
        {
            let state = self.state.read();
            if state.loaded && state.fingerprint == current {
                return f(&state.document);
            }
        }

        let mut state = self.state.write();
        let current = fingerprint(&self.data_path);
        if !state.loaded || state.fingerprint != current {
            debug!(scope = %self.scope, "Loading memory scope from disk");
            state.document = load_document(&self.data_path, &self.scope);
            state.fingerprint = current;
            state.loaded = true;
        }
        let state = RwLockWriteGuard::downgrade(state);
        f(&state.document)
    }

    /// Apply a mutation under the scope's exclusive lock.
    ///
    /// `f` returns its outcome and whether the document changed. Unchanged
    /// documents are not rewritten.
    pub(crate) fn mutate<R>(
        &self,
        config: &StoreConfig,
        f: impl FnOnce(&mut MemoryDocument) -> (R, bool),
    ) -> Result<R> {
        let mut state = self.state.write();

        fs::create_dir_all(&config.directory)
            .map_err(|e| MemoryError::storage(&config.directory, e))?;
        let _lock = ScopeLock::acquire(&self.lock_path, self.scope.id(), config.lock_timeout)?;

        let mut document = load_document(&self.data_path, &self.scope);
        let (outcome, changed) = f(&mut document);
        if changed {
            persist_document(&self.data_path, &self.scope, &document)?;
        }

        state.fingerprint = fingerprint(&self.data_path);
        state.document = document;
        state.loaded = true;
        Ok(outcome)
    }

    /// Delete the scope file under the exclusive lock, provided `should_remove`
    /// accepts its modification time as seen while the lock is held.
    pub(crate) fn remove_file_if<F>(&self, config: &StoreConfig, should_remove: F) -> Result<bool>
    where
        F: FnOnce(SystemTime) -> bool,
    {
        let mut state = self.state.write();
        let _lock = ScopeLock::acquire(&self.lock_path, self.scope.id(), config.lock_timeout)?;
        let modified = match fs::metadata(&self.data_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(MemoryError::storage(&self.data_path, e)),
        };
        if !should_remove(modified) {
            return Ok(false);
        }

        let removed = match fs::remove_file(&self.data_path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(MemoryError::storage(&self.data_path, e)),
        };
        state.document = MemoryDocument::new(self.scope.id());
        state.fingerprint = None;
        state.loaded = true;
        Ok(removed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Disk I/O
// ─────────────────────────────────────────────────────────────────────────────

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    fs::metadata(path).ok().map(|meta| Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Read a scope document. Missing, unreadable, or corrupt files yield an
/// empty document; the next write replaces them.
pub(crate) fn load_document(path: &Path, scope: &Scope) -> MemoryDocument {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return MemoryDocument::new(scope.id());
        }
        Err(e) => {
            warn!(scope = %scope, path = %path.display(), error = %e, "Memory file unreadable, treating scope as empty");
            return MemoryDocument::new(scope.id());
        }
    };

    match serde_json::from_slice::<MemoryDocument>(&bytes) {
        Ok(mut document) => {
            if document.session_id != scope.id() {
                warn!(
                    scope = %scope,
                    recorded = %document.session_id,
                    "Memory file recorded a different session id, adopting current scope"
                );
                document.session_id = scope.id().to_string();
            }
            document
        }
        Err(e) => {
            warn!(scope = %scope, path = %path.display(), error = %e, "Memory file corrupt, treating scope as empty");
            MemoryDocument::new(scope.id())
        }
    }
}

/// Persist a document by atomic replacement.
fn persist_document(path: &Path, scope: &Scope, document: &MemoryDocument) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_vec_pretty(document)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}", scope.file_stem()))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| MemoryError::storage(dir, e))?;
    tmp.write_all(&json)
        .map_err(|e| MemoryError::storage(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| MemoryError::storage(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| MemoryError::storage(path, e.error))?;

    debug!(
        scope = %scope,
        records = document.record_count(),
        bytes = json.len(),
        "Memory scope persisted"
    );
    Ok(())
}
