// src/bridge/mod.rs

//! Asynchronous execution bridge.
//!
//! [`AsyncBridge::execute`] returns a pending [`ResultHandle`] immediately and
//! runs the process on a separate tokio task. When the run finishes, metrics
//! are emitted and the settlement is handed back to the caller's
//! [`EventLoop`] through a [`CallbackTicket`] taken out at dispatch time.
//!
//! - [`promise`] holds the exactly-once handle/resolver pair.
//! - [`event_loop`] is the caller-side cooperative loop and its tickets.

pub mod event_loop;
pub mod promise;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::command::CommandSpec;
use crate::errors::ExecError;
use crate::metrics::MetricsEmitter;
use crate::runner::{CommandResult, ProcessBackend, RealProcessBackend};

pub use event_loop::{CallbackTicket, EventLoop, LoopRegistrar};
pub use promise::{HandleState, Resolver, ResultHandle, Settlement, pending};

/// Runs commands off the caller's loop and settles their handles on it.
///
/// Cheap to clone; clones share the backend, registrar, emitter and scope.
#[derive(Clone)]
pub struct AsyncBridge {
    backend: Arc<dyn ProcessBackend>,
    registrar: LoopRegistrar,
    scope: CancellationToken,
    emitter: Option<MetricsEmitter>,
    timeout: Option<Duration>,
    runtime: Option<Handle>,
}

impl fmt::Debug for AsyncBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncBridge")
            .field("registrar", &self.registrar)
            .field("scope_cancelled", &self.scope.is_cancelled())
            .field("emitter", &self.emitter)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AsyncBridge {
    /// Bridge spawning real processes, with no metrics and no deadline.
    ///
    /// `scope` mirrors the caller's lifecycle: cancelling it kills every
    /// process this bridge started.
    pub fn new(registrar: LoopRegistrar, scope: CancellationToken) -> Self {
        Self {
            backend: Arc::new(RealProcessBackend),
            registrar,
            scope,
            emitter: None,
            timeout: None,
            runtime: None,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProcessBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_emitter(mut self, emitter: MetricsEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Kill executions that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn workers on `runtime` instead of the ambient runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    /// Start `spec` and return its pending handle.
    ///
    /// Workers run on the runtime set with [`with_runtime`](Self::with_runtime),
    /// or on the current tokio runtime. With neither available the handle is
    /// returned already rejected with [`ExecError::NoRuntime`].
    pub fn execute(&self, spec: CommandSpec) -> ResultHandle {
        let (handle, resolver) = pending();

        let runtime = match self.runtime.clone().map_or_else(Handle::try_current, Ok) {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(
                    executable = spec.executable(),
                    error = %e,
                    "no tokio runtime; rejecting execution"
                );
                resolver.reject(ExecError::NoRuntime {
                    executable: spec.executable().to_string(),
                });
                return handle;
            }
        };

        let ticket = self.registrar.register_callback();

        let executable = spec.executable().to_string();
        let token = self.scope.child_token();
        let scope = self.scope.clone();
        let backend = Arc::clone(&self.backend);
        let emitter = self.emitter.clone();
        let timeout = self.timeout;

        let span = info_span!("exec", executable = %executable);
        let worker = async move {
            let run = backend.run(spec, token.clone());
            tokio::pin!(run);

            let deadline = async {
                match timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let result = tokio::select! {
                res = &mut run => res,
                _ = deadline => {
                    warn!(?timeout, "execution deadline exceeded; cancelling");
                    token.cancel();
                    run.await
                }
            };

            let settlement = result.map(|completed| {
                if let Some(emitter) = &emitter {
                    emitter.emit(&executable, &completed, &scope);
                }
                CommandResult::from(&completed.outcome)
            });

            if let Err(e) = &settlement {
                debug!(error = %e, "execution rejected");
            }

            ticket.redeem(move || {
                resolver.settle_with(settlement);
                Ok(())
            });
        }
        .instrument(span);

        drop(runtime.spawn(worker));

        handle
    }
}
