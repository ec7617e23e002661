// src/metrics/sample.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

/// How samples of a metric are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Cumulative sum.
    Counter,
    /// Distribution of values (min/avg/percentiles/max).
    Trend,
    /// Fraction of non-zero samples.
    Rate,
}

/// Unit hint used when rendering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Default,
    /// Milliseconds.
    Time,
    /// Bytes.
    Data,
}

/// A declared metric. Shared between all samples that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    pub value_type: ValueType,
}

/// Ordered tag set. Cloning is cheap enough for per-execution use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut tags = self.clone();
        tags.0.insert(key.into(), value.into());
        tags
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A metric plus the tags identifying one series of it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub metric: Arc<Metric>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub series: TimeSeries,
    pub value: f64,
    pub time: SystemTime,
}

impl Sample {
    pub fn metric_name(&self) -> &str {
        &self.series.metric.name
    }
}

/// Samples that were measured together and share tags and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedSamples {
    pub samples: Vec<Sample>,
    pub tags: Tags,
    pub time: SystemTime,
}
