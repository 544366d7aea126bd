//! Scope identifiers and their on-disk names.
//!
//! A scope (usually a generated session id) partitions durable memory. The
//! identifier arrives from outside the process, so it is never used as a path
//! component directly: it is reduced to `[A-Za-z0-9_-]`, bounded in length, and
//! suffixed with a digest of the raw identifier whenever that reduction was
//! lossy. Two distinct raw identifiers therefore never share a file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{MemoryError, Result};

/// Maximum length of the sanitized part of a file stem.
const MAX_STEM_LEN: usize = 64;

/// Hex characters of the digest appended to lossy stems.
const DIGEST_LEN: usize = 12;

/// File name prefix for scope files.
pub(crate) const FILE_PREFIX: &str = "session_";

/// Extension of scope data files.
pub(crate) const DATA_EXTENSION: &str = "json";

/// Extension of scope lock files.
pub(crate) const LOCK_EXTENSION: &str = "lock";

/// A validated scope identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    id: String,
    stem: String,
}

impl Scope {
    /// Validate a raw scope identifier.
    ///
    /// Empty and whitespace-only identifiers are rejected; everything else is
    /// accepted and sanitized.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MemoryError::InvalidScope(
                "scope identifier is empty".to_string(),
            ));
        }
        let stem = file_stem_for(&id);
        Ok(Self { id, stem })
    }

    /// The raw identifier as supplied.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sanitized stem used for file names.
    pub fn file_stem(&self) -> &str {
        &self.stem
    }

    /// Path of the scope's data file under `root`.
    pub fn data_path(&self, root: &Path) -> PathBuf {
        root.join(format!("{FILE_PREFIX}{}.{DATA_EXTENSION}", self.stem))
    }

    /// Path of the scope's lock file under `root`.
    pub fn lock_path(&self, root: &Path) -> PathBuf {
        root.join(format!("{FILE_PREFIX}{}.{LOCK_EXTENSION}", self.stem))
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

fn file_stem_for(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    if sanitized == id {
        return sanitized;
    }

    let digest = Sha256::digest(id.as_bytes());
    let suffix: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(DIGEST_LEN)
        .collect();
    format!("{sanitized}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifier_unchanged() {
        let scope = Scope::new("3f2a-session_01").unwrap();
        assert_eq!(scope.id(), "3f2a-session_01");
        assert_eq!(scope.file_stem(), "3f2a-session_01");
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(matches!(Scope::new(""), Err(MemoryError::InvalidScope(_))));
        assert!(matches!(Scope::new("   "), Err(MemoryError::InvalidScope(_))));
    }

    #[test]
    fn test_traversal_cannot_escape_root() {
        let root = Path::new("/var/lib/trestle/memory");
        for raw in ["../../etc/passwd", "..", "a/b", "a\\b", "x\0y", "/abs"] {
            let scope = Scope::new(raw).unwrap();
            let path = scope.data_path(root);
            assert_eq!(path.parent(), Some(root), "escaped for {raw:?}");
            assert!(!scope.file_stem().contains('.'));
            assert!(!scope.file_stem().contains('/'));
        }
    }

    #[test]
    fn test_lossy_sanitization_is_disambiguated() {
        let a = Scope::new("a/b").unwrap();
        let b = Scope::new("a_b").unwrap();
        let c = Scope::new("a.b").unwrap();
        assert_ne!(a.file_stem(), b.file_stem());
        assert_ne!(a.file_stem(), c.file_stem());
        assert!(a.file_stem().starts_with("a_b-"));
    }

    #[test]
    fn test_long_identifier_is_bounded() {
        let raw = "x".repeat(500);
        let scope = Scope::new(raw).unwrap();
        assert!(scope.file_stem().len() <= MAX_STEM_LEN + 1 + DIGEST_LEN);
    }

    #[test]
    fn test_paths() {
        let scope = Scope::new("abc").unwrap();
        let root = Path::new("/data");
        assert_eq!(scope.data_path(root), Path::new("/data/session_abc.json"));
        assert_eq!(scope.lock_path(root), Path::new("/data/session_abc.lock"));
    }
}
