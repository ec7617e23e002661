// src/runner/process.rs

//! Single process execution: spawn, drain, wait.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::CommandSpec;
use crate::errors::ExecError;

use super::outcome::{CompletedRun, RunOutcome, StreamKind, Stopwatch};
use super::resolve::resolve_executable;

/// Exit code reported when the OS gives neither a code nor a signal.
pub const NO_EXIT_CODE: i32 = -1;

/// How long to keep draining after a kill before giving up on the pipes.
///
/// Grandchildren that inherited the pipes can keep them open after the
/// direct child died; the run must still finish.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Run `spec` to completion.
///
/// Errors are only returned for launch faults and pipe read failures.
/// Cancelling `token` after the spawn kills the child and still yields a
/// [`RunOutcome`] describing the forced termination.
pub async fn run_process(
    spec: &CommandSpec,
    token: &CancellationToken,
) -> Result<CompletedRun, ExecError> {
    let executable = spec.executable();

    if token.is_cancelled() {
        return Err(ExecError::Cancelled {
            executable: executable.to_string(),
        });
    }

    let program = resolve_executable(executable)?;

    let mut cmd = Command::new(&program);
    cmd.args(spec.arguments())
        .envs(spec.environment())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let stopwatch = Stopwatch::start();
    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        executable: executable.to_string(),
        source,
    })?;

    let pid = child.id();
    info!(executable, ?pid, command = %spec, "process started");

    let mut stdout = child.stdout.take().ok_or_else(|| ExecError::PipeSetup {
        executable: executable.to_string(),
        stream: StreamKind::Stdout,
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| ExecError::PipeSetup {
        executable: executable.to_string(),
        stream: StreamKind::Stderr,
    })?;

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    // Set once a kill was attempted, whether or not it was delivered.
    let mut kill_attempted = false;

    {
        let drain = async {
            tokio::try_join!(
                drain_stream(&mut stdout, &mut stdout_buf, StreamKind::Stdout),
                drain_stream(&mut stderr, &mut stderr_buf, StreamKind::Stderr),
            )
        };
        tokio::pin!(drain);

        let drained = tokio::select! {
            res = &mut drain => res,
            _ = token.cancelled() => {
                kill_child(&mut child, executable);
                kill_attempted = true;
                match tokio::time::timeout(DRAIN_GRACE, &mut drain).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(
                            executable,
                            ?pid,
                            "pipes still open after kill; keeping output read so far"
                        );
                        Ok(((), ()))
                    }
                }
            }
        };

        drained.map_err(|(stream, source)| ExecError::Stream {
            executable: executable.to_string(),
            stream,
            source,
        })?;
    }

    let status = if kill_attempted {
        child.wait().await
    } else {
        tokio::select! {
            status = child.wait() => status,
            _ = token.cancelled() => {
                kill_child(&mut child, executable);
                child.wait().await
            }
        }
    };

    let timing = stopwatch.stop();

    let exit_code = match status {
        Ok(status) => exit_code_of(&status),
        Err(e) => {
            warn!(executable, ?pid, error = %e, "failed waiting for process; exit code unknown");
            NO_EXIT_CODE
        }
    };

    info!(
        executable,
        ?pid,
        exit_code,
        cancelled = token.is_cancelled(),
        duration_ms = timing.duration.as_millis() as u64,
        stdout_bytes = stdout_buf.len(),
        stderr_bytes = stderr_buf.len(),
        "process exited"
    );

    Ok(CompletedRun {
        outcome: RunOutcome {
            exit_code,
            stdout: stdout_buf,
            stderr: stderr_buf,
        },
        timing,
    })
}

async fn drain_stream<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    stream: StreamKind,
) -> Result<(), (StreamKind, std::io::Error)>
where
    R: AsyncRead + Unpin,
{
    let read = reader.read_to_end(buf).await.map_err(|e| (stream, e))?;
    debug!(%stream, bytes = read, "stream drained");
    Ok(())
}

/// Request termination. Called at most once per run.
fn kill_child(child: &mut Child, executable: &str) {
    info!(executable, pid = ?child.id(), "cancellation requested; killing process");
    if let Err(e) = child.start_kill() {
        warn!(executable, error = %e, "failed to kill child process on cancellation");
    }
}

/// Map an exit status to the code reported to callers.
///
/// A signal termination on Unix maps to `128 + signal`, the shell
/// convention. An abnormal termination never maps to `0`.
pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    NO_EXIT_CODE
}
