//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [memory]        # store location and output limits
//! [registry]      # reference resolution
//! [delegation]    # context attached to delegated tasks
//! [logging]       # optional JSON log file
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Overrides the memory directory.
pub const MEMORY_DIR_ENV: &str = "TRESTLE_MEMORY_DIR";

/// Overrides the default memory scope.
pub const SCOPE_ENV: &str = "TRESTLE_SCOPE";

/// Application name for platform directory resolution.
pub(crate) const APP_NAME: &str = "trestle";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrestleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistrySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<DelegationSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,
}

impl TrestleConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: TrestleConfig) {
        if other.memory.is_some() {
            self.memory = other.memory;
        }
        if other.registry.is_some() {
            self.registry = other.registry;
        }
        if other.delegation.is_some() {
            self.delegation = other.delegation;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[memory]` section, or its defaults.
    pub fn memory(&self) -> MemorySection {
        self.memory.clone().unwrap_or_default()
    }

    /// The `[registry]` section, or its defaults.
    pub fn registry(&self) -> RegistrySection {
        self.registry.clone().unwrap_or_default()
    }

    /// The `[delegation]` section, or its defaults.
    pub fn delegation(&self) -> DelegationSection {
        self.delegation.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or its defaults.
    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────────────────────────────────────

/// Memory store configuration.
///
/// ```toml
/// [memory]
/// directory = "~/.local/share/trestle/memory"
/// default_scope = "default"
/// search_limit = 10
/// recall_limit = 20
/// digest_preview_items = 3
/// preview_chars = 80
/// lock_timeout_ms = 5000
/// retention_days = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// Directory holding one JSON file per scope. `~` expands to home.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Scope used when none is given on the command line.
    pub default_scope: String,
    pub search_limit: usize,
    pub recall_limit: usize,
    pub digest_preview_items: usize,
    /// Characters of a value shown in digest previews.
    pub preview_chars: usize,
    pub lock_timeout_ms: u64,
    /// Scopes untouched for longer are deleted by `memory prune`. Unset means never.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            directory: None,
            default_scope: "default".to_string(),
            search_limit: 10,
            recall_limit: 20,
            digest_preview_items: 3,
            preview_chars: 80,
            lock_timeout_ms: 5000,
            retention_days: None,
        }
    }
}

impl MemorySection {
    /// Resolve the memory directory.
    ///
    /// Priority: `TRESTLE_MEMORY_DIR`, then `directory`, then the platform
    /// data dir (`~/.local/share/trestle/memory` on Linux).
    pub fn effective_directory(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(MEMORY_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.directory {
            return expand_home(dir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join("memory")
    }

    /// Resolve the default scope: `TRESTLE_SCOPE`, then `default_scope`.
    pub fn effective_scope(&self) -> String {
        match std::env::var(SCOPE_ENV) {
            Ok(scope) if !scope.trim().is_empty() => scope,
            _ => self.default_scope.clone(),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Maximum scope age before pruning, if retention is configured.
    pub fn retention(&self) -> Option<Duration> {
        self.retention_days
            .map(|days| Duration::from_secs(u64::from(days) * 24 * 60 * 60))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Component registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// How many recent components a plural pronoun ("them") resolves to.
    pub plural_reference_limit: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            plural_reference_limit: 3,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegation
// ─────────────────────────────────────────────────────────────────────────────

/// Context attached when the triage agent delegates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationSection {
    pub history_turns: usize,
    pub memory_hits: usize,
}

impl Default for DelegationSection {
    fn default() -> Self {
        Self {
            history_turns: 6,
            memory_hits: 5,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Log file configuration. Console logging is always on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Write daily-rolling JSON logs.
    pub file: bool,
    /// Directory for log files. `~` expands to home.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl LoggingSection {
    /// Resolve the log directory: `directory`, then `<config dir>/trestle/logs`.
    pub fn effective_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => expand_home(dir),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("logs"),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const FULL: &str = r#"
[memory]
directory = "/var/lib/trestle"
default_scope = "bridge"
search_limit = 5
recall_limit = 8
digest_preview_items = 2
preview_chars = 40
lock_timeout_ms = 250
retention_days = 30

[registry]
plural_reference_limit = 2

[delegation]
history_turns = 4
memory_hits = 1

[logging]
file = true
directory = "/tmp/trestle-logs"
"#;

    #[test]
    fn test_parse_full() {
        let config = TrestleConfig::from_toml(FULL).unwrap();
        let memory = config.memory();
        assert_eq!(memory.directory, Some(PathBuf::from("/var/lib/trestle")));
        assert_eq!(memory.search_limit, 5);
        assert_eq!(memory.preview_chars, 40);
        assert_eq!(memory.lock_timeout(), Duration::from_millis(250));
        assert_eq!(memory.retention(), Some(Duration::from_secs(30 * 86_400)));
        assert_eq!(config.registry().plural_reference_limit, 2);
        assert_eq!(config.delegation().history_turns, 4);
        assert!(config.logging().file);
    }

    #[test]
    fn test_empty_uses_defaults() {
        let config = TrestleConfig::from_toml("").unwrap();
        assert!(config.memory.is_none());
        assert_eq!(config.memory(), MemorySection::default());
        assert_eq!(config.memory().retention(), None);
        assert_eq!(config.registry().plural_reference_limit, 3);
        assert_eq!(config.delegation().memory_hits, 5);
        assert!(!config.logging().file);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = TrestleConfig::from_toml("[memory]\nsearch_limit = 3\n").unwrap();
        let memory = config.memory();
        assert_eq!(memory.search_limit, 3);
        assert_eq!(memory.recall_limit, 20);
        assert_eq!(memory.default_scope, "default");
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = TrestleConfig::from_toml(FULL).unwrap();
        let overlay = TrestleConfig::from_toml("[registry]\nplural_reference_limit = 7\n").unwrap();
        base.merge(overlay);

        assert_eq!(base.registry().plural_reference_limit, 7);
        assert_eq!(base.memory().default_scope, "bridge");
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(TrestleConfig::from_toml("[memory]\nsearch_limit = \"many\"\n").is_err());
    }

    #[test]
    #[serial]
    fn test_memory_dir_env_override() {
        let memory = TrestleConfig::from_toml(FULL).unwrap().memory();
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(MEMORY_DIR_ENV) };
        assert_eq!(memory.effective_directory(), PathBuf::from("/var/lib/trestle"));

        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(MEMORY_DIR_ENV, "/from/env") };
        assert_eq!(memory.effective_directory(), PathBuf::from("/from/env"));
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(MEMORY_DIR_ENV) };
    }

    #[test]
    #[serial]
    fn test_scope_env_override() {
        let memory = MemorySection::default();
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(SCOPE_ENV) };
        assert_eq!(memory.effective_scope(), "default");

        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(SCOPE_ENV, "bridge-42") };
        assert_eq!(memory.effective_scope(), "bridge-42");
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(SCOPE_ENV) };
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/memory")), home.join("memory"));
        }
    }
}
