// src/metrics/emitter.rs

//! Conversion of a finished execution into metric samples.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::runner::CompletedRun;
use crate::types::FailedRatePolarity;

use super::registry::ExecMetrics;
use super::sample::{ConnectedSamples, Metric, Sample, Tags, TimeSeries};
use super::sink::MetricsSink;

pub const EXECUTABLE_TAG: &str = "executable";
pub const EXIT_CODE_TAG: &str = "exit_code";

/// Builds the five per-execution samples and pushes them to a sink.
///
/// Emission never fails from the caller's point of view: sink errors are
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct MetricsEmitter {
    metrics: ExecMetrics,
    sink: Arc<dyn MetricsSink>,
    ambient: Tags,
    polarity: FailedRatePolarity,
}

impl MetricsEmitter {
    pub fn new(metrics: ExecMetrics, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            metrics,
            sink,
            ambient: Tags::new(),
            polarity: FailedRatePolarity::default(),
        }
    }

    /// Tags attached to every sample in addition to the per-run ones.
    pub fn with_ambient_tags(mut self, tags: Tags) -> Self {
        self.ambient = tags;
        self
    }

    pub fn with_polarity(mut self, polarity: FailedRatePolarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn polarity(&self) -> FailedRatePolarity {
        self.polarity
    }

    /// Samples for one execution, all stamped with its end time.
    pub fn samples_for(&self, executable: &str, run: &CompletedRun) -> ConnectedSamples {
        let exit_code = run.outcome.exit_code;
        let tags = self
            .ambient
            .with(EXECUTABLE_TAG, executable)
            .with(EXIT_CODE_TAG, exit_code.to_string());
        let time = run.timing.ended_at;

        let sample = |metric: &Arc<Metric>, value: f64| Sample {
            series: TimeSeries {
                metric: Arc::clone(metric),
                tags: tags.clone(),
            },
            value,
            time,
        };

        let samples = vec![
            sample(
                &self.metrics.command_duration,
                run.timing.duration.as_millis() as f64,
            ),
            sample(&self.metrics.commands_total, 1.0),
            sample(&self.metrics.stdout_bytes, run.outcome.stdout.len() as f64),
            sample(&self.metrics.stderr_bytes, run.outcome.stderr.len() as f64),
            sample(&self.metrics.failed_rate, self.polarity.value_for(exit_code)),
        ];

        ConnectedSamples {
            samples,
            tags,
            time,
        }
    }

    /// Push samples for `run` unless `scope` is already cancelled.
    ///
    /// Returns whether the sink accepted the batch.
    pub fn emit(&self, executable: &str, run: &CompletedRun, scope: &CancellationToken) -> bool {
        if scope.is_cancelled() {
            debug!(executable, "scope cancelled; skipping metrics emission");
            return false;
        }

        match self.sink.push(self.samples_for(executable, run)) {
            Ok(()) => true,
            Err(e) => {
                warn!(executable, error = %e, "dropping execution metrics");
                false
            }
        }
    }
}
