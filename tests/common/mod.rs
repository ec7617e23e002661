#![allow(dead_code)]

pub use execbridge_test_utils::builders;
pub use execbridge_test_utils::{
    FailingSink, FakeBackend, HangingBackend, init_tracing, with_timeout,
};

use std::sync::Arc;

use execbridge::bridge::EventLoop;
use execbridge::metrics::{MemorySink, MetricsSink, Sample};
use execbridge::module::{ExecModule, ExecModuleBuilder};
use tokio_util::sync::CancellationToken;

/// Event loop, scope and module builder wired to a fresh in-memory sink.
pub struct Harness {
    pub event_loop: EventLoop,
    pub scope: CancellationToken,
    pub sink: Arc<MemorySink>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            event_loop: EventLoop::new(),
            scope: CancellationToken::new(),
            sink: Arc::new(MemorySink::new()),
        }
    }

    pub fn module_builder(&self) -> ExecModuleBuilder {
        let sink: Arc<dyn MetricsSink> = self.sink.clone();
        ExecModule::builder(self.event_loop.registrar(), self.scope.clone()).sink(sink)
    }

    pub fn module(&self) -> ExecModule {
        self.module_builder()
            .build()
            .expect("default module should build")
    }

    pub fn samples_named(&self, name: &str) -> Vec<Sample> {
        self.sink
            .samples()
            .into_iter()
            .filter(|s| s.metric_name() == name)
            .collect()
    }
}
