#![allow(dead_code)]

use execbridge::config::{ConfigFile, RawConfigFile};
use execbridge::types::FailedRatePolarity;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.exec.timeout_ms = Some(ms);
        self
    }

    pub fn polarity(mut self, polarity: FailedRatePolarity) -> Self {
        self.config.metrics.failed_rate_polarity = polarity;
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.config
            .metrics
            .tags
            .insert(key.to_string(), value.to_string());
        self
    }

    /// The raw, unvalidated config (for exercising validation failures).
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
