// src/errors.rs

//! Crate-wide error types and aliases.

use thiserror::Error;

use crate::runner::StreamKind;

/// Faults that reject a [`ResultHandle`](crate::bridge::ResultHandle).
///
/// A process that started and terminated, with any exit code, never
/// produces one of these; its outcome is reported through `RunOutcome`.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("executable not found: {name:?}")]
    ExecutableNotFound { name: String },

    #[error("failed to attach {stream} pipe for '{executable}'")]
    PipeSetup {
        executable: String,
        stream: StreamKind,
    },

    #[error("failed to start '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading {stream} of '{executable}': {source}")]
    Stream {
        executable: String,
        stream: StreamKind,
        #[source]
        source: std::io::Error,
    },

    #[error("execution of '{executable}' cancelled before the process started")]
    Cancelled { executable: String },

    #[error("no tokio runtime available to run '{executable}'")]
    NoRuntime { executable: String },

    #[error("result handle abandoned before settlement")]
    Abandoned,
}

impl ExecError {
    /// True for faults raised before or while starting the process.
    pub fn is_launch_fault(&self) -> bool {
        matches!(
            self,
            ExecError::ExecutableNotFound { .. }
                | ExecError::PipeSetup { .. }
                | ExecError::Spawn { .. }
        )
    }
}

/// Errors raised while declaring metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid metric name {0:?}")]
    InvalidName(String),

    #[error("metric '{name}' already registered with a different kind or value type")]
    Conflict { name: String },
}

/// Errors a metrics sink may report. Always swallowed by the emitter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("metrics sink is full")]
    Full,

    #[error("metrics sink is closed")]
    Closed,

    #[error("metrics sink rejected samples: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ExecbridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecbridgeError>;
