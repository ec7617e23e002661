// src/module.rs

//! Caller-facing entry point.
//!
//! One [`ExecModule`] exists per caller context. It hands out [`Cmd`] values
//! that accumulate arguments and environment overrides and, on
//! [`Cmd::exec`], run through the module's [`AsyncBridge`].
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use execbridge::bridge::EventLoop;
//! use execbridge::module::ExecModule;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut event_loop = EventLoop::new();
//! let module = ExecModule::builder(event_loop.registrar(), CancellationToken::new()).build()?;
//!
//! let result = event_loop
//!     .start(async {
//!         let handle = module.cmd("echo").arg("Hello, World!").exec();
//!         Ok::<_, anyhow::Error>(handle.await?)
//!     })
//!     .await?;
//! assert_eq!(result.stdout, "Hello, World!\n");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bridge::{AsyncBridge, LoopRegistrar, ResultHandle};
use crate::command::{CommandBuilder, CommandSpec};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::metrics::{ExecMetrics, MetricsEmitter, MetricsSink, NullSink, Registry, Tags};
use crate::runner::ProcessBackend;
use crate::types::FailedRatePolarity;

/// Per-caller module instance.
#[derive(Debug, Clone)]
pub struct ExecModule {
    bridge: AsyncBridge,
}

impl ExecModule {
    pub fn new(bridge: AsyncBridge) -> Self {
        Self { bridge }
    }

    pub fn builder(registrar: LoopRegistrar, scope: CancellationToken) -> ExecModuleBuilder {
        ExecModuleBuilder::new(registrar, scope)
    }

    /// Start describing a command for `executable`.
    pub fn cmd(&self, executable: impl Into<String>) -> Cmd {
        Cmd {
            builder: CommandBuilder::new(executable),
            bridge: self.bridge.clone(),
        }
    }

    pub fn bridge(&self) -> &AsyncBridge {
        &self.bridge
    }
}

/// Assembles an [`ExecModule`] from its collaborators.
pub struct ExecModuleBuilder {
    registrar: LoopRegistrar,
    scope: CancellationToken,
    registry: Option<Registry>,
    sink: Arc<dyn MetricsSink>,
    ambient_tags: Tags,
    polarity: FailedRatePolarity,
    timeout: Option<Duration>,
    backend: Option<Arc<dyn ProcessBackend>>,
}

impl ExecModuleBuilder {
    fn new(registrar: LoopRegistrar, scope: CancellationToken) -> Self {
        Self {
            registrar,
            scope,
            registry: None,
            sink: Arc::new(NullSink),
            ambient_tags: Tags::new(),
            polarity: FailedRatePolarity::default(),
            timeout: None,
            backend: None,
        }
    }

    /// Apply `[exec]` and `[metrics]` settings.
    pub fn config(mut self, config: &ConfigFile) -> Self {
        self.ambient_tags = config.ambient_tags();
        self.polarity = config.metrics.failed_rate_polarity;
        self.timeout = config.timeout();
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Registry to declare the execution metrics in. A fresh one is used
    /// when none is given.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn polarity(mut self, polarity: FailedRatePolarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn ambient_tags(mut self, tags: Tags) -> Self {
        self.ambient_tags = tags;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ProcessBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<ExecModule> {
        let mut registry = self.registry.unwrap_or_default();
        let metrics = ExecMetrics::register(&mut registry)?;

        let emitter = MetricsEmitter::new(metrics, self.sink)
            .with_ambient_tags(self.ambient_tags)
            .with_polarity(self.polarity);

        let mut bridge = AsyncBridge::new(self.registrar, self.scope)
            .with_emitter(emitter)
            .with_timeout(self.timeout);
        if let Some(backend) = self.backend {
            bridge = bridge.with_backend(backend);
        }

        debug!(polarity = ?self.polarity, timeout = ?self.timeout, "exec module ready");
        Ok(ExecModule::new(bridge))
    }
}

/// A command being described by the caller.
///
/// Chained calls return updated values; a `Cmd` can be executed any number
/// of times, each execution getting its own copy of the spec.
#[derive(Debug, Clone)]
#[must_use]
pub struct Cmd {
    builder: CommandBuilder,
    bridge: AsyncBridge,
}

impl Cmd {
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.builder = self.builder.arg(value);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.env(key, value);
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        self.builder.spec()
    }

    /// Run the command. Never blocks; the handle settles later on the
    /// caller's event loop.
    ///
    /// Outside a tokio runtime (and without one set on the bridge) the
    /// handle comes back rejected with `ExecError::NoRuntime` instead of
    /// panicking.
    pub fn exec(&self) -> ResultHandle {
        self.bridge.execute(self.builder.clone().build())
    }
}
