// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "EXECBRIDGE_CONFIG";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks the deadline and ambient tag invariants.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(path = %path.as_ref().display(), "config loaded");
    Ok(config)
}

/// Resolve which config file to use, if any.
///
/// Priority: explicit path, then `EXECBRIDGE_CONFIG`, then
/// `execbridge.toml` in the current directory when it exists.
pub fn default_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from("execbridge.toml");
    local.is_file().then_some(local)
}

/// Load the resolved config, falling back to defaults when there is none.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match default_config_path(explicit) {
        Some(path) => load_and_validate(path),
        None => Ok(ConfigFile::default()),
    }
}
