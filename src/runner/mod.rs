// src/runner/mod.rs

//! Process execution layer.
//!
//! This module turns a [`CommandSpec`](crate::command::CommandSpec) into a
//! running OS process using `tokio::process::Command`, and reports back a
//! [`RunOutcome`] once the process has exited and both pipes are drained.
//!
//! - [`resolve`] looks executables up on `PATH`.
//! - [`process`] spawns the child, drains stdout/stderr and waits for it.
//! - [`outcome`] holds the result and timing types.
//! - [`backend`] provides the `ProcessBackend` trait and the production
//!   `RealProcessBackend`, which tests can replace with a fake.

pub mod backend;
pub mod outcome;
pub mod process;
pub mod resolve;

pub use backend::{ProcessBackend, RealProcessBackend, RunFuture};
pub use outcome::{CommandResult, CompletedRun, ExecutionTiming, RunOutcome, Stopwatch, StreamKind};
pub use process::{NO_EXIT_CODE, exit_code_of, run_process};
pub use resolve::resolve_executable;
