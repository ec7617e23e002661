// src/runner/backend.rs

//! Pluggable process backend abstraction.
//!
//! The bridge talks to a `ProcessBackend` instead of calling
//! [`run_process`] directly. Production code uses [`RealProcessBackend`];
//! tests can provide a backend that returns scripted outcomes without
//! spawning anything.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::command::CommandSpec;
use crate::errors::ExecError;

use super::outcome::CompletedRun;
use super::process::run_process;

pub type RunFuture = Pin<Box<dyn Future<Output = Result<CompletedRun, ExecError>> + Send>>;

/// Trait abstracting how a [`CommandSpec`] turns into a [`CompletedRun`].
pub trait ProcessBackend: Send + Sync {
    /// Run `spec`. Cancelling `token` must terminate whatever was started.
    fn run(&self, spec: CommandSpec, token: CancellationToken) -> RunFuture;
}

/// Backend that spawns real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessBackend;

impl ProcessBackend for RealProcessBackend {
    fn run(&self, spec: CommandSpec, token: CancellationToken) -> RunFuture {
        Box::pin(async move { run_process(&spec, &token).await })
    }
}
