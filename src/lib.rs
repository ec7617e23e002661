// src/lib.rs

pub mod bridge;
pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod module;
pub mod runner;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{EventLoop, Settlement};
use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::metrics::{MemorySink, MetricsSummary};
use crate::module::ExecModule;
use crate::runner::CommandResult;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the caller event loop and exec module
/// - in-memory metrics collection and the end-of-run summary
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref()).context("loading configuration")?;
    if let Some(ms) = args.timeout_ms {
        cfg.exec.timeout_ms = Some(ms);
    }

    let sink = Arc::new(MemorySink::new());
    let scope = CancellationToken::new();
    let mut event_loop = EventLoop::new();

    // Ctrl-C → cancel every running execution.
    {
        let scope = scope.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupt received; cancelling executions");
            scope.cancel();
        });
    }

    let module = ExecModule::builder(event_loop.registrar(), scope.clone())
        .config(&cfg)
        .sink(sink.clone())
        .build()?;

    let mut cmd = module.cmd(args.executable.as_str());
    for arg in &args.args {
        cmd = cmd.arg(arg.as_str());
    }
    for (key, value) in &args.env {
        cmd = cmd.env(key.as_str(), value.as_str());
    }

    info!(
        command = %cmd.spec(),
        repeat = args.repeat,
        timeout = ?cfg.timeout().map(|d: Duration| d.as_millis()),
        "starting executions"
    );

    let handles: Vec<_> = (0..args.repeat).map(|_| cmd.exec()).collect();

    let settlements: Vec<Settlement> = event_loop
        .start(async move {
            let mut settled = Vec::with_capacity(handles.len());
            for handle in handles {
                settled.push(handle.await);
            }
            Ok(settled)
        })
        .await?;

    for (index, settlement) in settlements.iter().enumerate() {
        print_settlement(index, settlement, args.json)?;
    }

    let summary = MetricsSummary::from_samples(&sink.samples());
    if !summary.is_empty() {
        eprintln!("{summary}");
    }

    debug!("run complete");
    Ok(())
}

fn print_settlement(index: usize, settlement: &Settlement, json: bool) -> Result<()> {
    match settlement {
        Ok(result) if json => {
            println!("{}", serde_json::to_string(result)?);
        }
        Ok(result) => print_plain(index, result),
        Err(err) if json => {
            let line = serde_json::json!({ "error": err.to_string() });
            println!("{line}");
        }
        Err(err) => eprintln!("execution #{index} failed: {err}"),
    }
    Ok(())
}

fn print_plain(index: usize, result: &CommandResult) {
    println!("execution #{index}: exit code {}", result.exit_code);
    if !result.stdout.is_empty() {
        println!("--- stdout ---");
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    if !result.stderr.is_empty() {
        println!("--- stderr ---");
        print!("{}", result.stderr);
        if !result.stderr.ends_with('\n') {
            println!();
        }
    }
}
