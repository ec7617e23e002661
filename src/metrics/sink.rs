// src/metrics/sink.rs

//! Destinations for emitted samples.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::errors::SinkError;

use super::sample::{ConnectedSamples, Sample};

/// Push-style, non-blocking receiver of sample batches.
///
/// Implementations must return promptly; a slow or broken sink reports an
/// error instead of waiting.
pub trait MetricsSink: Send + Sync + Debug {
    fn push(&self, batch: ConnectedSamples) -> Result<(), SinkError>;
}

/// Forwards batches over a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ConnectedSamples>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ConnectedSamples>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl MetricsSink for ChannelSink {
    fn push(&self, batch: ConnectedSamples) -> Result<(), SinkError> {
        self.tx.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Keeps every batch in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<ConnectedSamples>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<ConnectedSamples> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All samples, flattened across batches.
    pub fn samples(&self) -> Vec<Sample> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flat_map(|batch| batch.samples.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl MetricsSink for MemorySink {
    fn push(&self, batch: ConnectedSamples) -> Result<(), SinkError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch);
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn push(&self, _batch: ConnectedSamples) -> Result<(), SinkError> {
        Ok(())
    }
}
