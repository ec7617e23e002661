// src/command/spec.rs

use std::collections::BTreeMap;
use std::fmt;

use super::CommandBuilder;

/// Fully determined description of one process invocation.
///
/// Produced by [`CommandBuilder::build`] and consumed by the runner, which
/// only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub(crate) executable: String,
    pub(crate) arguments: Vec<String>,
    pub(crate) environment: BTreeMap<String, String>,
}

impl CommandSpec {
    /// A spec with no arguments and no environment overrides.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    pub fn builder(executable: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(executable)
    }

    /// Executable name as given by the caller. Resolved at execution time.
    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Overrides layered on top of the ambient environment.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.arguments {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
