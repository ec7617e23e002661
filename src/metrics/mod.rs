// src/metrics/mod.rs

//! Execution telemetry.
//!
//! - [`sample`] defines metrics, tags and samples.
//! - [`registry`] declares metrics by name, including the five
//!   [`ExecMetrics`] every execution reports.
//! - [`sink`] is where emitted samples go.
//! - [`emitter`] converts a finished run into samples.
//! - [`summary`] aggregates collected samples for an end-of-run report.

pub mod emitter;
pub mod registry;
pub mod sample;
pub mod sink;
pub mod summary;

pub use emitter::{EXECUTABLE_TAG, EXIT_CODE_TAG, MetricsEmitter};
pub use registry::{ExecMetrics, Registry};
pub use sample::{ConnectedSamples, Metric, MetricKind, Sample, Tags, TimeSeries, ValueType};
pub use sink::{ChannelSink, MemorySink, MetricsSink, NullSink};
pub use summary::{MetricStats, MetricsSummary};
