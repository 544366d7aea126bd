//! Session enumeration and age-based pruning.
//!
//! Stores never expire on their own. Pruning runs only when a caller asks for
//! it, and each deletion happens under the scope's exclusive lock. Lock files
//! are left in place: removing one while another process waits on it would let
//! two writers hold "the" lock at once.

use std::fs;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::MemoryStore;
use crate::error::{MemoryError, Result};
use crate::scope::{DATA_EXTENSION, FILE_PREFIX, Scope};
use crate::types::{MemoryDocument, PruneReport, SessionInfo};

impl MemoryStore {
    /// List persisted scopes, most recently modified first.
    ///
    /// Files that cannot be parsed are skipped with a warning.
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let dir = self.directory();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::storage(dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(&format!(".{DATA_EXTENSION}")) {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            let document = match fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<MemoryDocument>(&bytes).ok())
            {
                Some(document) => document,
                None => {
                    warn!(path = %path.display(), "Skipping unreadable memory file");
                    continue;
                }
            };

            sessions.push(SessionInfo {
                categories: document.category_count(),
                records: document.record_count(),
                session_id: document.session_id,
                path,
                modified: DateTime::<Utc>::from(modified),
            });
        }

        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(sessions)
    }

    /// Delete scope files not written within `max_age`.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<PruneReport> {
        let cutoff = DateTime::<Utc>::from(
            SystemTime::now()
                .checked_sub(max_age)
                .unwrap_or(SystemTime::UNIX_EPOCH),
        );
        let mut report = PruneReport::default();

        for session in self.list_sessions()? {
            if session.modified >= cutoff {
                report.kept += 1;
                continue;
            }

            let scope = match Scope::new(session.session_id.clone()) {
                Ok(scope) if scope.data_path(self.directory()) == session.path => scope,
                _ => {
                    warn!(path = %session.path.display(), "Memory file name does not match its session id, leaving it");
                    report.kept += 1;
                    continue;
                }
            };

            // Another writer may have touched the scope since it was listed.
            let handle = self.scope(scope.id())?;
            if handle.remove_scope_file_if(|modified| DateTime::<Utc>::from(modified) < cutoff)? {
                debug!(scope = %scope, "Pruned memory scope");
                report.removed.push(scope.id().to_string());
            } else {
                report.kept += 1;
            }
        }

        info!(
            removed = report.removed.len(),
            kept = report.kept,
            "Memory retention sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_sessions_empty_directory() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path().join("never-created"));
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_list_sessions_reports_counts() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path());
        let a = store.scope("alpha").unwrap();
        a.put("c1", "k1", "v").unwrap();
        a.put("c2", "k2", "v").unwrap();
        store.scope("beta").unwrap().put("c", "k", "v").unwrap();
        fs::write(dir.path().join("session_broken.json"), "{not json").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        let alpha = sessions.iter().find(|s| s.session_id == "alpha").unwrap();
        assert_eq!(alpha.records, 2);
        assert_eq!(alpha.categories, 2);
    }

    #[test]
    fn test_prune_zero_age_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path());
        let memory = store.scope("old").unwrap();
        memory.put("c", "k", "v").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let report = store.prune_older_than(Duration::ZERO).unwrap();
        assert_eq!(report.removed, vec!["old".to_string()]);
        assert!(memory.is_empty());
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_conditional_remove_checks_time_under_lock() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path());
        let memory = store.scope("busy").unwrap();
        memory.put("c", "k", "old").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let listed_at = SystemTime::now();
        std::thread::sleep(Duration::from_millis(20));

        // A write lands after the scope was judged stale.
        memory.put("c", "k", "new").unwrap();
        assert!(!memory.remove_scope_file_if(|modified| modified < listed_at).unwrap());
        assert_eq!(memory.recall(Some("c"), Some("k")), "new");
        assert_eq!(store.list_sessions().unwrap().len(), 1);

        assert!(memory.remove_scope_file_if(|_| true).unwrap());
        assert!(!memory.remove_scope_file_if(|_| true).unwrap());
    }

    #[test]
    fn test_prune_keeps_recent_sessions() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path());
        store.scope("fresh").unwrap().put("c", "k", "v").unwrap();

        let report = store
            .prune_older_than(Duration::from_secs(24 * 60 * 60))
            .unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.kept, 1);
    }
}
