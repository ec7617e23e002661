mod common;
use crate::common::{FakeBackend, Harness, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use execbridge::bridge::{AsyncBridge, EventLoop, HandleState, pending};
use execbridge::command::CommandSpec;
use execbridge::errors::ExecError;
use execbridge::module::ExecModule;
use execbridge::runner::{CommandResult, StreamKind};
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn Error>>;

fn result(exit_code: i32, stdout: &str) -> CommandResult {
    CommandResult {
        exit_code,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

#[tokio::test]
async fn second_settlement_has_no_observable_effect() -> TestResult {
    init_tracing();
    let (handle, resolver) = pending();
    let racer = resolver.clone();

    assert!(resolver.fulfill(result(0, "first")));
    assert!(!racer.fulfill(result(1, "second")));
    assert!(!racer.reject(ExecError::Abandoned));

    assert_eq!(handle.state(), HandleState::Fulfilled);
    let value = with_timeout(handle).await?;
    assert_eq!(value, result(0, "first"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_resolvers_settle_exactly_once() -> TestResult {
    let (handle, resolver) = pending();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.fulfill(result(i, "")) })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if task.await? {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let value = with_timeout(handle).await?;
    assert!((0..16).contains(&value.exit_code));
    Ok(())
}

#[tokio::test]
async fn dropped_resolver_resolves_as_abandoned() {
    let (handle, resolver) = pending();
    drop(resolver);

    assert!(matches!(with_timeout(handle).await, Err(ExecError::Abandoned)));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_event_loop_abandons_pending_handles() {
    init_tracing();
    let event_loop = EventLoop::new();
    let backend = FakeBackend::new(0, "never seen", "").with_delay(Duration::from_millis(50));
    let bridge = AsyncBridge::new(event_loop.registrar(), CancellationToken::new())
        .with_backend(Arc::new(backend.clone()));

    let handle = bridge.execute(CommandSpec::new("tool"));
    drop(event_loop);

    assert!(matches!(with_timeout(handle).await, Err(ExecError::Abandoned)));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn bridge_hands_each_execution_its_own_spec() -> TestResult {
    let mut h = Harness::new();
    let backend = FakeBackend::new(3, "scripted", "warn");
    let module = h.module_builder().backend(Arc::new(backend.clone())).build()?;

    let base = module.cmd("tool").env("MODE", "a");
    let first = base.clone().arg("one").exec();
    let second = base.env("MODE", "b").arg("two").exec();

    let (a, b) = with_timeout(h.event_loop.start(async {
        Ok((first.await, second.await))
    }))
    .await?;

    assert_eq!(a?, CommandResult { exit_code: 3, stdout: "scripted".into(), stderr: "warn".into() });
    assert_eq!(b?.exit_code, 3);

    let mut specs = backend.specs();
    specs.sort_by(|a, b| a.arguments().cmp(b.arguments()));
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].arguments(), ["one"]);
    assert_eq!(specs[0].environment().get("MODE").map(String::as_str), Some("a"));
    assert_eq!(specs[1].arguments(), ["two"]);
    assert_eq!(specs[1].environment().get("MODE").map(String::as_str), Some("b"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_fault_rejects_and_discards_partial_output() -> TestResult {
    let mut h = Harness::new();
    let backend = FakeBackend::stream_fault(StreamKind::Stderr);
    let module = h.module_builder().backend(Arc::new(backend.clone())).build()?;

    let handle = module.cmd("tool").exec();
    let settled = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await?;

    match settled {
        Err(ExecError::Stream { executable, stream, .. }) => {
            assert_eq!(executable, "tool");
            assert_eq!(stream, StreamKind::Stderr);
        }
        other => panic!("expected a stream fault, got {other:?}"),
    }
    assert_eq!(backend.calls(), 1);
    assert!(h.sink.is_empty(), "a rejected run emits no metrics");
    assert_eq!(h.event_loop.outstanding(), 0);
    Ok(())
}

#[test]
fn exec_outside_a_runtime_rejects_instead_of_panicking() {
    init_tracing();
    let event_loop = EventLoop::new();
    let backend = FakeBackend::new(0, "", "");
    let module = ExecModule::builder(event_loop.registrar(), CancellationToken::new())
        .backend(Arc::new(backend.clone()))
        .build()
        .unwrap();

    let handle = module.cmd("tool").exec();
    assert_eq!(handle.state(), HandleState::Rejected);
    assert_eq!(event_loop.outstanding(), 0);
    assert_eq!(backend.calls(), 0);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    match runtime.block_on(handle) {
        Err(ExecError::NoRuntime { executable }) => assert_eq!(executable, "tool"),
        other => panic!("expected NoRuntime, got {other:?}"),
    }
}
