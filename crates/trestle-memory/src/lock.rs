//! Exclusive per-scope file locks.
//!
//! Every read-modify-write cycle on a scope holds an advisory lock on the
//! scope's `.lock` file. The lock spans processes as well as threads, and is
//! released when the guard drops on every exit path.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::error::{MemoryError, Result};

/// Delay between lock attempts while contended.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Guard holding an exclusive lock on a scope.
#[derive(Debug)]
pub(crate) struct ScopeLock {
    file: File,
    path: PathBuf,
}

impl ScopeLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    pub(crate) fn acquire(path: &Path, scope: &str, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| MemoryError::storage(path, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => {
                    trace!(scope = %scope, waited = ?started.elapsed(), "Scope lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!(scope = %scope, ?waited, "Timed out waiting for scope lock");
                        return Err(MemoryError::LockTimeout {
                            scope: scope.to_string(),
                            waited,
                        });
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(TryLockError::Error(e)) => return Err(MemoryError::storage(path, e)),
            }
        }
    }
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "Failed to release scope lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_a.lock");

        let held = ScopeLock::acquire(&path, "a", Duration::from_secs(1)).unwrap();
        let err = ScopeLock::acquire(&path, "a", Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, MemoryError::LockTimeout { .. }));

        drop(held);
        assert!(ScopeLock::acquire(&path, "a", Duration::from_millis(200)).is_ok());
    }

    #[test]
    fn test_lock_in_missing_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("session_a.lock");
        let err = ScopeLock::acquire(&path, "a", Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, MemoryError::Storage { .. }));
    }
}
