// src/metrics/summary.rs

//! End-of-run aggregation of collected samples.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::sample::{MetricKind, Sample, ValueType};

/// Aggregate of every sample of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetricStats {
    Counter {
        sum: f64,
    },
    Trend {
        value_type: ValueType,
        count: usize,
        min: f64,
        avg: f64,
        med: f64,
        p90: f64,
        p95: f64,
        max: f64,
    },
    Rate {
        passes: usize,
        total: usize,
    },
}

impl MetricStats {
    /// Fraction of non-zero samples for rates, `None` otherwise.
    pub fn rate(&self) -> Option<f64> {
        match self {
            MetricStats::Rate { passes, total } if *total > 0 => {
                Some(*passes as f64 / *total as f64)
            }
            MetricStats::Rate { .. } => Some(0.0),
            _ => None,
        }
    }
}

/// Per-metric aggregates, ordered by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub metrics: BTreeMap<String, MetricStats>,
}

impl MetricsSummary {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut grouped: BTreeMap<&str, (MetricKind, ValueType, Vec<f64>)> = BTreeMap::new();
        for sample in samples {
            let metric = &sample.series.metric;
            grouped
                .entry(metric.name.as_str())
                .or_insert_with(|| (metric.kind, metric.value_type, Vec::new()))
                .2
                .push(sample.value);
        }

        let metrics = grouped
            .into_iter()
            .map(|(name, (kind, value_type, values))| {
                (name.to_string(), aggregate(kind, value_type, values))
            })
            .collect();

        Self { metrics }
    }

    pub fn get(&self, name: &str) -> Option<&MetricStats> {
        self.metrics.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

fn aggregate(kind: MetricKind, value_type: ValueType, mut values: Vec<f64>) -> MetricStats {
    match kind {
        MetricKind::Counter => MetricStats::Counter {
            sum: values.iter().sum(),
        },
        MetricKind::Rate => MetricStats::Rate {
            passes: values.iter().filter(|v| **v != 0.0).count(),
            total: values.len(),
        },
        MetricKind::Trend => {
            values.sort_by(f64::total_cmp);
            let count = values.len();
            let avg = if count == 0 {
                0.0
            } else {
                values.iter().sum::<f64>() / count as f64
            };
            MetricStats::Trend {
                value_type,
                count,
                min: values.first().copied().unwrap_or(0.0),
                avg,
                med: percentile(&values, 50.0),
                p90: percentile(&values, 90.0),
                p95: percentile(&values, 95.0),
                max: values.last().copied().unwrap_or(0.0),
            }
        }
    }
}

/// Linear-interpolated percentile of a **sorted** slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

fn unit(value_type: ValueType, value: f64) -> String {
    match value_type {
        ValueType::Time => format!("{value:.2}ms"),
        ValueType::Data => format!("{value:.0}B"),
        ValueType::Default => format!("{value:.2}"),
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, stats) in &self.metrics {
            match stats {
                MetricStats::Counter { sum } => writeln!(f, "  {name:.<32} {sum}")?,
                MetricStats::Rate { passes, total } => {
                    let pct = stats.rate().unwrap_or(0.0) * 100.0;
                    writeln!(f, "  {name:.<32} {pct:.2}% {passes} out of {total}")?
                }
                MetricStats::Trend {
                    value_type,
                    count,
                    min,
                    avg,
                    med,
                    p90,
                    p95,
                    max,
                } => writeln!(
                    f,
                    "  {name:.<32} count={count} avg={} min={} med={} max={} p(90)={} p(95)={}",
                    unit(*value_type, *avg),
                    unit(*value_type, *min),
                    unit(*value_type, *med),
                    unit(*value_type, *max),
                    unit(*value_type, *p90),
                    unit(*value_type, *p95),
                )?,
            }
        }
        Ok(())
    }
}
