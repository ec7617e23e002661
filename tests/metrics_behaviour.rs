mod common;
use crate::common::{FailingSink, FakeBackend, Harness, builders::ConfigFileBuilder, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use execbridge::bridge::EventLoop;
use execbridge::metrics::registry::{COMMANDS_TOTAL, COMMAND_DURATION, FAILED_RATE, STDOUT_BYTES};
use execbridge::metrics::{ChannelSink, MetricKind, MetricStats, MetricsSummary, Registry, ValueType};
use execbridge::module::ExecModule;
use execbridge::types::FailedRatePolarity;
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn Error>>;

async fn run_codes(h: &mut Harness, module: &ExecModule, codes: &[i32]) -> TestResult {
    // Each code gets its own backend so outcomes differ per execution.
    let handles: Vec<_> = codes
        .iter()
        .map(|code| {
            let backend = FakeBackend::new(*code, "12345", "");
            module
                .bridge()
                .clone()
                .with_backend(Arc::new(backend))
                .execute(module.cmd("tool").spec().clone())
        })
        .collect();

    let settled = with_timeout(h.event_loop.start(async move {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await);
        }
        Ok(out)
    }))
    .await?;
    for s in settled {
        s?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_rate_reports_non_zero_exits_by_default() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();
    run_codes(&mut h, &module, &[0, 0, 1, 2]).await?;

    let values: Vec<f64> = h.samples_named(FAILED_RATE).iter().map(|s| s.value).collect();
    assert_eq!(values.len(), 4);
    assert_eq!(values.iter().sum::<f64>(), 2.0);

    let summary = MetricsSummary::from_samples(&h.sink.samples());
    match summary.get(FAILED_RATE) {
        Some(MetricStats::Rate { passes, total }) => {
            assert_eq!((*passes, *total), (2, 4));
        }
        other => panic!("unexpected stats {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_exit_polarity_inverts_the_failed_rate() -> TestResult {
    let mut h = Harness::new();
    let cfg = ConfigFileBuilder::new()
        .polarity(FailedRatePolarity::ZeroExit)
        .build();
    let module = h.module_builder().config(&cfg).build()?;
    run_codes(&mut h, &module, &[0, 0, 0, 7]).await?;

    let ones = h
        .samples_named(FAILED_RATE)
        .iter()
        .filter(|s| s.value == 1.0)
        .count();
    assert_eq!(ones, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ambient_tags_ride_along_with_every_sample() -> TestResult {
    let mut h = Harness::new();
    let cfg = ConfigFileBuilder::new().tag("scenario", "smoke").build();
    let module = h.module_builder().config(&cfg).build()?;
    run_codes(&mut h, &module, &[0]).await?;

    let samples = h.sink.samples();
    assert_eq!(samples.len(), 5);
    assert!(samples.iter().all(|s| s.series.tags.get("scenario") == Some("smoke")));

    let stdout = h.samples_named(STDOUT_BYTES);
    assert_eq!(stdout[0].value, 5.0);
    let total = h.samples_named(COMMANDS_TOTAL);
    assert_eq!(total[0].series.metric.kind, MetricKind::Counter);
    let duration = h.samples_named(COMMAND_DURATION);
    assert_eq!(duration[0].series.metric.value_type, ValueType::Time);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn broken_sink_never_affects_settlement() -> TestResult {
    common::init_tracing();
    let mut event_loop = EventLoop::new();
    let sink = FailingSink::new();
    let module = ExecModule::builder(event_loop.registrar(), CancellationToken::new())
        .sink(Arc::new(sink.clone()))
        .backend(Arc::new(FakeBackend::new(0, "ok", "")))
        .build()?;

    let handle = module.cmd("tool").exec();
    let result = with_timeout(event_loop.start(async { Ok(handle.await) })).await??;

    assert_eq!(result.stdout, "ok");
    assert_eq!(sink.attempts(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_channel_sink_drops_batches_without_blocking() -> TestResult {
    common::init_tracing();
    let mut event_loop = EventLoop::new();
    let (sink, mut rx) = ChannelSink::new(1);
    let module = ExecModule::builder(event_loop.registrar(), CancellationToken::new())
        .sink(Arc::new(sink))
        .backend(Arc::new(FakeBackend::new(0, "", "")))
        .build()?;

    let handles: Vec<_> = (0..3).map(|_| module.cmd("tool").exec()).collect();
    let settled = with_timeout(event_loop.start(async move {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await);
        }
        Ok(out)
    }))
    .await?;

    assert!(settled.iter().all(|s| s.is_ok()));
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err(), "capacity 1 keeps a single batch");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_registry_conflicts_surface_at_build() -> TestResult {
    let h = Harness::new();
    let mut registry = Registry::new();
    registry.new_metric(FAILED_RATE, MetricKind::Counter, ValueType::Default)?;

    let err = h
        .module_builder()
        .registry(registry)
        .build()
        .expect_err("conflicting kind must be rejected");
    assert!(err.to_string().contains(FAILED_RATE));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_backend_duration_is_recorded_in_milliseconds() -> TestResult {
    let mut h = Harness::new();
    let backend = FakeBackend::new(0, "", "").with_delay(Duration::from_millis(60));
    let module = h.module_builder().backend(Arc::new(backend)).build()?;

    let handle = module.cmd("tool").exec();
    with_timeout(h.event_loop.start(async { Ok(handle.await) })).await??;

    let duration = h.samples_named(COMMAND_DURATION);
    assert_eq!(duration.len(), 1);
    assert!(duration[0].value >= 60.0, "got {}", duration[0].value);
    Ok(())
}
