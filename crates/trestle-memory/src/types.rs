//! Data types persisted by the memory store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records of one category, keyed by record key.
pub type CategoryRecords = BTreeMap<String, MemoryRecord>;

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Opaque text value.
    pub value: String,
    /// When the value was last written.
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a record stamped with the current time.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            timestamp: Utc::now(),
        }
    }
}

/// On-disk document for one scope.
///
/// ```json
/// {
///   "session_id": "abc",
///   "memories": { "<category>": { "<key>": { "value": "...", "timestamp": "..." } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Unsanitized scope identifier this document belongs to.
    pub session_id: String,
    /// Category -> key -> record.
    #[serde(default)]
    pub memories: BTreeMap<String, CategoryRecords>,
}

impl MemoryDocument {
    /// Create an empty document for a scope.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            memories: BTreeMap::new(),
        }
    }

    /// Total number of records across all categories.
    pub fn record_count(&self) -> usize {
        self.memories.values().map(BTreeMap::len).sum()
    }

    /// Number of non-empty categories.
    pub fn category_count(&self) -> usize {
        self.memories.values().filter(|c| !c.is_empty()).count()
    }

    /// Whether the document holds no records.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Most recent write timestamp in the document.
    pub fn last_written(&self) -> Option<DateTime<Utc>> {
        self.memories
            .values()
            .flat_map(|c| c.values())
            .map(|r| r.timestamp)
            .max()
    }
}

/// A record matched by a search, flattened with its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Category the record lives in.
    pub category: String,
    /// Record key.
    pub key: String,
    /// Stored value.
    pub value: String,
    /// Last write time.
    pub timestamp: DateTime<Utc>,
}

impl SearchHit {
    /// `category/key` address of the hit.
    pub fn address(&self) -> String {
        format!("{}/{}", self.category, self.key)
    }
}

/// What a clear removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    /// Categories removed.
    pub categories: usize,
    /// Records removed.
    pub records: usize,
}

/// A persisted scope discovered on disk.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Unsanitized scope identifier recorded in the file.
    pub session_id: String,
    /// Path of the scope file.
    pub path: PathBuf,
    /// Number of categories.
    pub categories: usize,
    /// Number of records.
    pub records: usize,
    /// File modification time.
    pub modified: DateTime<Utc>,
}

/// Result of a retention sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// Scope identifiers whose files were deleted.
    pub removed: Vec<String>,
    /// Number of scope files left in place.
    pub kept: usize,
}
