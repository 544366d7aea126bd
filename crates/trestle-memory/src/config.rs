//! Configuration for the memory store.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of hits returned by `search_memory`.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default number of entries listed by a category recall.
pub const DEFAULT_RECALL_LIMIT: usize = 20;

/// Categories at or below this size get inline previews in the digest.
pub const DEFAULT_DIGEST_PREVIEW_ITEMS: usize = 3;

/// Characters of a value shown in digest previews.
pub const DEFAULT_PREVIEW_CHARS: usize = 80;

/// Default maximum wait for a scope's exclusive lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one file per scope.
    pub directory: PathBuf,

    /// Default result cap for searches.
    pub search_limit: usize,

    /// Maximum entries shown when recalling a whole category.
    pub recall_limit: usize,

    /// Inline previews are shown for categories up to this size.
    pub digest_preview_items: usize,

    /// Characters of a value shown in previews.
    pub preview_chars: usize,

    /// Bounded wait for the exclusive lock on a scope.
    pub lock_timeout: Duration,
}

impl StoreConfig {
    /// Create a configuration rooted at `directory` with default limits.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            recall_limit: DEFAULT_RECALL_LIMIT,
            digest_preview_items: DEFAULT_DIGEST_PREVIEW_ITEMS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the default search limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Set the category recall limit.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit.max(1);
        self
    }

    /// Set the digest preview threshold.
    pub fn with_digest_preview_items(mut self, items: usize) -> Self {
        self.digest_preview_items = items;
        self
    }

    /// Set the preview length, in characters. Values below 4 are raised to 4
    /// so a truncated preview still shows one character before the ellipsis.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars.max(4);
        self
    }

    /// Set the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
