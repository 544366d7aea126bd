//! Typed operations on a single scope.

use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{MemoryStore, ScopeSlot};
use crate::error::{MemoryError, Result};
use crate::scope::Scope;
use crate::types::{ClearOutcome, MemoryDocument, MemoryRecord, SearchHit};

/// Handle to one scope of a [`MemoryStore`].
///
/// Handles for the same scope obtained from the same store share one cache.
#[derive(Clone)]
pub struct ScopedMemory {
    store: MemoryStore,
    slot: Arc<ScopeSlot>,
}

impl std::fmt::Debug for ScopedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedMemory")
            .field("scope", &self.slot.scope().id())
            .finish()
    }
}

impl ScopedMemory {
    pub(super) fn new(store: MemoryStore, slot: Arc<ScopeSlot>) -> Self {
        Self { store, slot }
    }

    /// The scope this handle is bound to.
    pub fn scope(&self) -> &Scope {
        self.slot.scope()
    }

    /// The store this handle belongs to.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Write or overwrite a record, persisting immediately.
    pub fn put(&self, category: &str, key: &str, value: &str) -> Result<DateTime<Utc>> {
        let category = required("category", category)?;
        let key = required("key", key)?;

        let record = MemoryRecord::new(value);
        let timestamp = record.timestamp;
        let replaced = self.slot.mutate(self.store.config(), |doc| {
            let replaced = doc
                .memories
                .entry(category.to_string())
                .or_default()
                .insert(key.to_string(), record)
                .is_some();
            (replaced, true)
        })?;

        debug!(scope = %self.scope(), category, key, replaced, "Memory stored");
        Ok(timestamp)
    }

    /// Exact lookup.
    pub fn get(&self, category: &str, key: &str) -> Option<MemoryRecord> {
        self.slot.read(|doc| {
            doc.memories
                .get(category.trim())
                .and_then(|c| c.get(key.trim()))
                .cloned()
        })
    }

    /// Categories with their record counts, in name order.
    pub fn categories(&self) -> Vec<(String, usize)> {
        self.slot.read(|doc| {
            doc.memories
                .iter()
                .filter(|(_, records)| !records.is_empty())
                .map(|(name, records)| (name.clone(), records.len()))
                .collect()
        })
    }

    /// Whether a category exists with at least one record.
    pub fn has_category(&self, category: &str) -> bool {
        self.slot.read(|doc| {
            doc.memories
                .get(category.trim())
                .is_some_and(|c| !c.is_empty())
        })
    }

    /// All records of a category, newest first (ties broken by key).
    pub fn entries(&self, category: &str) -> Vec<(String, MemoryRecord)> {
        let mut entries: Vec<(String, MemoryRecord)> = self.slot.read(|doc| {
            doc.memories
                .get(category.trim())
                .map(|c| c.iter().map(|(k, r)| (k.clone(), r.clone())).collect())
                .unwrap_or_default()
        });
        entries.sort_by(|(ka, a), (kb, b)| b.timestamp.cmp(&a.timestamp).then_with(|| ka.cmp(kb)));
        entries
    }

    /// Every category holding `key`, newest first.
    pub fn find_key(&self, key: &str) -> Vec<SearchHit> {
        let key = key.trim();
        let mut hits: Vec<SearchHit> = self.slot.read(|doc| {
            doc.memories
                .iter()
                .filter_map(|(category, records)| {
                    records.get(key).map(|r| SearchHit {
                        category: category.clone(),
                        key: key.to_string(),
                        value: r.value.clone(),
                        timestamp: r.timestamp,
                    })
                })
                .collect()
        });
        sort_hits(&mut hits);
        hits
    }

    /// Case-insensitive substring search over category names, keys and values.
    ///
    /// Returns every match, newest first. An empty query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let lowered = query.trim().to_lowercase();
        let needle = lowered.as_str();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self.slot.read(|doc| {
            doc.memories
                .iter()
                .flat_map(|(category, records)| {
                    let category_hit = category.to_lowercase().contains(needle);
                    records.iter().filter_map(move |(key, record)| {
                        let matched = category_hit
                            || key.to_lowercase().contains(needle)
                            || record.value.to_lowercase().contains(needle);
                        matched.then(|| SearchHit {
                            category: category.clone(),
                            key: key.clone(),
                            value: record.value.clone(),
                            timestamp: record.timestamp,
                        })
                    })
                })
                .collect()
        });
        sort_hits(&mut hits);
        hits
    }

    /// Remove one category, or the whole scope when `category` is `None`.
    ///
    /// The removal is a single locked rewrite; concurrent readers see either
    /// the full prior state or the cleared state.
    pub fn clear(&self, category: Option<&str>) -> Result<ClearOutcome> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let outcome = self.slot.mutate(self.store.config(), |doc| match category {
            Some(name) => match doc.memories.remove(name) {
                Some(records) => (
                    ClearOutcome {
                        categories: 1,
                        records: records.len(),
                    },
                    true,
                ),
                None => (ClearOutcome::default(), false),
            },
            None => {
                let outcome = ClearOutcome {
                    categories: doc.category_count(),
                    records: doc.record_count(),
                };
                let changed = !doc.memories.is_empty();
                doc.memories.clear();
                (outcome, changed)
            }
        })?;

        info!(
            scope = %self.scope(),
            category = category.unwrap_or("*"),
            records = outcome.records,
            "Memory cleared"
        );
        Ok(outcome)
    }

    /// Number of records in the scope.
    pub fn len(&self) -> usize {
        self.slot.read(MemoryDocument::record_count)
    }

    /// Whether the scope holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete this scope's durable file under its exclusive lock.
    ///
    /// Returns whether a file was removed.
    pub fn remove_scope_file(&self) -> Result<bool> {
        self.remove_scope_file_if(|_| true)
    }

    /// Like [`remove_scope_file`](Self::remove_scope_file), but only when
    /// `should_remove` accepts the file's modification time, checked under
    /// the lock.
    pub(crate) fn remove_scope_file_if<F>(&self, should_remove: F) -> Result<bool>
    where
        F: FnOnce(SystemTime) -> bool,
    {
        let removed = self.slot.remove_file_if(self.store.config(), should_remove)?;
        if removed {
            info!(scope = %self.scope(), "Memory scope file removed");
        }
        Ok(removed)
    }

    /// A copy of the whole scope document.
    pub fn snapshot(&self) -> MemoryDocument {
        self.slot.read(MemoryDocument::clone)
    }
}

fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MemoryError::invalid_argument(format!("{name} must not be empty")));
    }
    Ok(trimmed)
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.key.cmp(&b.key))
    });
}
