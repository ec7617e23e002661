// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::metrics::Tags;
use crate::types::FailedRatePolarity;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [exec]
/// timeout_ms = 30000
///
/// [metrics]
/// failed_rate_polarity = "non_zero_exit"
/// tags = { scenario = "smoke" }
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub exec: ExecSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

/// `[exec]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecSection {
    /// Per-execution deadline in milliseconds. The process is killed when it
    /// expires. No deadline when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Which exit codes `exec_command_failed_rate` reports as `1`.
    #[serde(default)]
    pub failed_rate_polarity: FailedRatePolarity,

    /// Ambient tags added to every sample.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (or `Default`).
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub exec: ExecSection,
    pub metrics: MetricsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(exec: ExecSection, metrics: MetricsSection) -> Self {
        Self { exec, metrics }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.exec.timeout_ms.map(Duration::from_millis)
    }

    pub fn ambient_tags(&self) -> Tags {
        self.metrics
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
