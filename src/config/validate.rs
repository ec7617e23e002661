// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExecbridgeError, Result};
use crate::metrics::{EXECUTABLE_TAG, EXIT_CODE_TAG};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ExecbridgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.exec, raw.metrics))
    }
}

/// Check the invariants a [`ConfigFile`] guarantees.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_exec(cfg)?;
    validate_tags(cfg)?;
    Ok(())
}

fn validate_exec(cfg: &RawConfigFile) -> Result<()> {
    if cfg.exec.timeout_ms == Some(0) {
        return Err(ExecbridgeError::ConfigError(
            "[exec].timeout_ms must be >= 1 (got 0); omit it to disable the deadline".to_string(),
        ));
    }
    Ok(())
}

fn validate_tags(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.metrics.tags.keys() {
        if key.trim().is_empty() {
            return Err(ExecbridgeError::ConfigError(
                "[metrics].tags contains an empty tag name".to_string(),
            ));
        }
        if key == EXECUTABLE_TAG || key == EXIT_CODE_TAG {
            return Err(ExecbridgeError::ConfigError(format!(
                "[metrics].tags cannot override the per-execution tag '{}'",
                key
            )));
        }
    }
    Ok(())
}
