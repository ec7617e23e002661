use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use execbridge::command::CommandSpec;
use execbridge::errors::{ExecError, SinkError};
use execbridge::metrics::{ConnectedSamples, MetricsSink};
use execbridge::runner::{
    CompletedRun, ProcessBackend, RunFuture, RunOutcome, Stopwatch, StreamKind,
};
use tokio_util::sync::CancellationToken;

/// A fake backend that:
/// - records every spec it was asked to run
/// - reports a fixed outcome after an optional delay, without spawning
///   anything, or a read failure on one stream when built with
///   [`FakeBackend::stream_fault`].
#[derive(Debug, Clone)]
pub struct FakeBackend {
    outcome: RunOutcome,
    fault: Option<StreamKind>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    specs: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeBackend {
    pub fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            outcome: RunOutcome {
                exit_code,
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            },
            fault: None,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every run with `ExecError::Stream` on `stream`, as if the pipe
    /// broke mid-read after some output was captured.
    pub fn stream_fault(stream: StreamKind) -> Self {
        Self {
            fault: Some(stream),
            ..Self::new(0, "partial", "partial")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl ProcessBackend for FakeBackend {
    fn run(&self, spec: CommandSpec, _token: CancellationToken) -> RunFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().push(spec.clone());

        let outcome = self.outcome.clone();
        let fault = self.fault;
        let delay = self.delay;
        Box::pin(async move {
            let watch = Stopwatch::start();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(stream) = fault {
                return Err(ExecError::Stream {
                    executable: spec.executable().to_string(),
                    stream,
                    source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke"),
                });
            }
            Ok(CompletedRun {
                outcome,
                timing: watch.stop(),
            })
        })
    }
}

/// A backend whose "process" runs until its token is cancelled, then
/// reports the given forced-termination exit code.
#[derive(Debug, Clone)]
pub struct HangingBackend {
    killed_exit_code: i32,
    cancelled: Arc<AtomicUsize>,
}

impl HangingBackend {
    pub fn new(killed_exit_code: i32) -> Self {
        Self {
            killed_exit_code,
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many runs observed cancellation.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ProcessBackend for HangingBackend {
    fn run(&self, spec: CommandSpec, token: CancellationToken) -> RunFuture {
        let exit_code = self.killed_exit_code;
        let cancelled = Arc::clone(&self.cancelled);
        Box::pin(async move {
            if token.is_cancelled() {
                return Err(ExecError::Cancelled {
                    executable: spec.executable().to_string(),
                });
            }
            let watch = Stopwatch::start();
            token.cancelled().await;
            cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(CompletedRun {
                outcome: RunOutcome {
                    exit_code,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                },
                timing: watch.stop(),
            })
        })
    }
}

/// A sink that rejects everything and counts attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MetricsSink for FailingSink {
    fn push(&self, _batch: ConnectedSamples) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Rejected("sink is broken".to_string()))
    }
}
