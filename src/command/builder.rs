// src/command/builder.rs

//! Fluent construction of [`CommandSpec`] values.
//!
//! The builder is an owned value: every call consumes it and hands back the
//! updated builder. Cloning a builder and extending the clones independently
//! never lets one clone observe the other's arguments or environment.

use super::CommandSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CommandBuilder {
    spec: CommandSpec,
}

impl CommandBuilder {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            spec: CommandSpec::new(executable),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.spec.arguments.push(value.into());
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.arguments.extend(values.into_iter().map(Into::into));
        self
    }

    /// Set an environment override. A later write to the same key wins.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.environment.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.spec.environment.insert(key.into(), value.into());
        }
        self
    }

    /// Peek at the spec accumulated so far.
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn build(self) -> CommandSpec {
        self.spec
    }
}

impl From<CommandBuilder> for CommandSpec {
    fn from(builder: CommandBuilder) -> Self {
        builder.build()
    }
}
