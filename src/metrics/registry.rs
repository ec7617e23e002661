// src/metrics/registry.rs

//! Metric declarations.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::RegistryError;

use super::sample::{Metric, MetricKind, ValueType};

pub const COMMAND_DURATION: &str = "exec_command_duration";
pub const COMMANDS_TOTAL: &str = "exec_commands_total";
pub const STDOUT_BYTES: &str = "exec_command_stdout_bytes";
pub const STDERR_BYTES: &str = "exec_command_stderr_bytes";
pub const FAILED_RATE: &str = "exec_command_failed_rate";

/// Name-keyed set of declared metrics.
///
/// Declaring the same name twice with the same kind and value type returns
/// the existing metric, so several module instances can share a registry.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: BTreeMap<String, Arc<Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_metric(
        &mut self,
        name: &str,
        kind: MetricKind,
        value_type: ValueType,
    ) -> Result<Arc<Metric>, RegistryError> {
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        if let Some(existing) = self.metrics.get(name) {
            if existing.kind != kind || existing.value_type != value_type {
                return Err(RegistryError::Conflict {
                    name: name.to_string(),
                });
            }
            return Ok(Arc::clone(existing));
        }

        debug!(metric = name, ?kind, ?value_type, "registering metric");
        let metric = Arc::new(Metric {
            name: name.to_string(),
            kind,
            value_type,
        });
        self.metrics.insert(name.to_string(), Arc::clone(&metric));
        Ok(metric)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Metric>> {
        self.metrics.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The five metrics every execution reports.
#[derive(Debug, Clone)]
pub struct ExecMetrics {
    pub command_duration: Arc<Metric>,
    pub commands_total: Arc<Metric>,
    pub stdout_bytes: Arc<Metric>,
    pub stderr_bytes: Arc<Metric>,
    pub failed_rate: Arc<Metric>,
}

impl ExecMetrics {
    pub fn register(registry: &mut Registry) -> Result<Self, RegistryError> {
        Ok(Self {
            commands_total: registry.new_metric(
                COMMANDS_TOTAL,
                MetricKind::Counter,
                ValueType::Default,
            )?,
            command_duration: registry.new_metric(
                COMMAND_DURATION,
                MetricKind::Trend,
                ValueType::Time,
            )?,
            stdout_bytes: registry.new_metric(STDOUT_BYTES, MetricKind::Trend, ValueType::Data)?,
            stderr_bytes: registry.new_metric(STDERR_BYTES, MetricKind::Trend, ValueType::Data)?,
            failed_rate: registry.new_metric(FAILED_RATE, MetricKind::Rate, ValueType::Default)?,
        })
    }
}
