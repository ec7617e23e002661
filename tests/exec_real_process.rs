#![cfg(unix)]

mod common;
use crate::common::{Harness, with_timeout};

use std::error::Error;

use execbridge::bridge::HandleState;
use execbridge::errors::ExecError;
use execbridge::metrics::registry::{
    COMMAND_DURATION, COMMANDS_TOTAL, FAILED_RATE, STDERR_BYTES, STDOUT_BYTES,
};
use execbridge::metrics::{EXECUTABLE_TAG, EXIT_CODE_TAG};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread")]
async fn echo_fulfills_with_captured_stdout() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    let handle = module.cmd("echo").arg("hello").exec();
    assert_eq!(handle.state(), HandleState::Pending);

    let settled = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await?;
    let result = settled?;

    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("hello"));
    assert_eq!(result.stderr, "");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn non_zero_exit_fulfills_instead_of_rejecting() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    let handle = module
        .cmd("sh")
        .arg("-c")
        .arg("echo oops >&2; exit 2")
        .exec();
    let result = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await??;

    assert_eq!(result.exit_code, 2);
    assert_eq!(result.stderr, "oops\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_executable_rejects() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    let handle = module.cmd("definitely-not-a-real-binary-4c1e").exec();
    let settled = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await?;

    match settled {
        Err(ExecError::ExecutableNotFound { name }) => {
            assert_eq!(name, "definitely-not-a-real-binary-4c1e")
        }
        other => panic!("expected ExecutableNotFound, got {other:?}"),
    }
    assert!(h.sink.is_empty(), "launch faults emit no metrics");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_executable_is_a_launch_fault_at_exec_time() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    // Construction never fails; only execution does.
    let cmd = module.cmd("").arg("x");
    assert_eq!(cmd.spec().arguments(), ["x"]);

    let handle = cmd.exec();
    let settled = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await?;
    let err = settled.expect_err("empty executable must reject");
    assert!(err.is_launch_fault(), "unexpected error: {err}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn environment_overrides_win_and_ambient_is_kept() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    let handle = module
        .cmd("sh")
        .arg("-c")
        .arg("printf '%s|%s' \"$EXECBRIDGE_PROBE\" \"${PATH:+has-path}\"")
        .env("EXECBRIDGE_PROBE", "first")
        .env("EXECBRIDGE_PROBE", "second")
        .exec();
    let result = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await??;

    assert_eq!(result.stdout, "second|has-path");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn large_output_on_both_streams_is_fully_drained() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    // Larger than a pipe buffer on each stream.
    let script = "i=0; while [ $i -lt 20000 ]; do echo out-line; echo err-line >&2; i=$((i+1)); done";
    let handle = module.cmd("sh").arg("-c").arg(script).exec();
    let result = with_timeout(h.event_loop.start(async { Ok(handle.await) })).await??;

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.len(), 20000 * "out-line\n".len());
    assert_eq!(result.stderr.len(), 20000 * "err-line\n".len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_executions_settle_independently_with_five_samples_each() -> TestResult {
    let mut h = Harness::new();
    let module = h.module();

    let codes = [0, 1, 2, 3, 0, 5];
    let handles: Vec<_> = codes
        .iter()
        .map(|code| {
            module
                .cmd("sh")
                .arg("-c")
                .arg(format!("echo run-{code}; exit {code}"))
                .exec()
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

    for (code, settlement) in codes.iter().zip(settled) {
        let result = settlement?;
        assert_eq!(result.exit_code, *code);
        assert_eq!(result.stdout, format!("run-{code}\n"));
    }

    let batches = h.sink.batches();
    assert_eq!(batches.len(), codes.len());
    for batch in &batches {
        assert_eq!(batch.samples.len(), 5);
        let exit_code = batch.tags.get(EXIT_CODE_TAG).expect("exit_code tag");
        assert_eq!(batch.tags.get(EXECUTABLE_TAG), Some("sh"));

        let names: Vec<&str> = batch.samples.iter().map(|s| s.metric_name()).collect();
        assert_eq!(
            names,
            [COMMAND_DURATION, COMMANDS_TOTAL, STDOUT_BYTES, STDERR_BYTES, FAILED_RATE]
        );
        for sample in &batch.samples {
            assert_eq!(sample.time, batch.time);
            assert_eq!(sample.series.tags.get(EXIT_CODE_TAG), Some(exit_code));
        }

        let failed = batch
            .samples
            .iter()
            .find(|s| s.metric_name() == FAILED_RATE)
            .map(|s| s.value);
        let expected = if exit_code == "0" { 0.0 } else { 1.0 };
        assert_eq!(failed, Some(expected));
    }

    let mut seen: Vec<String> = batches
        .iter()
        .filter_map(|b| b.tags.get(EXIT_CODE_TAG).map(str::to_string))
        .collect();
    seen.sort();
    assert_eq!(seen, ["0", "0", "1", "2", "3", "5"]);
    Ok(())
}
