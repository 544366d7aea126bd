//! Configuration system for Trestle.
//!
//! Provides TOML-based configuration with:
//! - `[memory]`, `[registry]`, `[delegation]` and `[logging]` sections
//! - Config file layering (user config dir, then project-local `trestle.toml`)
//! - Environment overrides for the memory directory and default scope
//!
//! Library crates never read these files; the binary converts the sections
//! into their runtime configs.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
