// src/runner/outcome.rs

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

/// Which captured stream an event or fault refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Terminal result of a process that actually ran.
///
/// Built once, after the process exited and both pipes were drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Start and end of one execution.
///
/// `duration` comes from a monotonic clock; the wall-clock instants are kept
/// for timestamping metric samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTiming {
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub duration: Duration,
}

/// Measures an [`ExecutionTiming`] from the spawn call onwards.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
    started_at: SystemTime,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: SystemTime::now(),
        }
    }

    pub fn stop(self) -> ExecutionTiming {
        let duration = self.started.elapsed();
        ExecutionTiming {
            started_at: self.started_at,
            ended_at: self.started_at + duration,
            duration,
        }
    }
}

/// A [`RunOutcome`] together with the timing it was measured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRun {
    pub outcome: RunOutcome,
    pub timing: ExecutionTiming,
}

/// Value a fulfilled result handle yields to the caller.
///
/// Field names follow the scripting host's camel-case convention when
/// serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl From<&RunOutcome> for CommandResult {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            exit_code: outcome.exit_code,
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&outcome.stderr).into_owned(),
        }
    }
}
