mod compiler;
mod executor;
mod memcheck;
mod probe;
mod sandbox;
mod scoring;
mod suite;
mod workspace;

#[cfg(test)]
mod sandbox_tests;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use gradebox_common::config::EvalLimits;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tracing::{error, info, warn};

use workspace::ScratchWorkspace;

#[derive(Parser)]
#[command(name = "gradebox")]
#[command(about = "Sandbox and grade an untrusted program against a test suite", long_about = None)]
struct Cli {
    /// C source file to compile and evaluate
    source: PathBuf,

    /// JSON test-definition file
    tests: PathBuf,

    /// Wall-clock deadline per sandboxed run, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Address-space ceiling for sandboxed runs, in MiB
    #[arg(long)]
    memory_mb: Option<u64>,

    /// CPU-time ceiling for sandboxed runs, in seconds
    #[arg(long)]
    cpu_s: Option<u64>,

    /// Where the results report is written
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut limits = EvalLimits::default();
    if let Some(ms) = cli.timeout_ms {
        limits.wall_timeout = Duration::from_millis(ms);
    }
    if let Some(mb) = cli.memory_mb {
        limits.memory_limit_mb = mb;
    }
    if let Some(secs) = cli.cpu_s {
        limits.cpu_time_limit_s = secs;
    }
    if let Some(report) = cli.report {
        limits.report_path = report;
    }

    // Setup failures abort before anything runs
    let suite = suite::load_suite(&cli.tests).map_err(|e| {
        error!(error = %e, tests = %cli.tests.display(), "Failed to load test cases");
        e
    })?;
    suite::print_suite_info(&suite);

    let mut workspace = ScratchWorkspace::create(&limits)?;
    let scratch_dir = workspace.root().to_path_buf();

    // An external interrupt or termination signal aborts the whole
    // evaluation, not just the active child; the scratch directory and
    // transient files are swept either way.
    let result = tokio::select! {
        result = executor::run_evaluation(&limits, &suite, &scratch_dir, &cli.source) => result,
        _ = shutdown_signal() => {
            warn!("Received termination signal, cleaning up and exiting");
            workspace.cleanup();
            std::process::exit(1);
        }
    };

    match result {
        Ok(metrics) => {
            println!(
                "→ Evaluation complete. Results written to {}",
                limits.report_path.display()
            );
            info!(
                tests_passed = metrics.tests_passed,
                tests_failed = metrics.tests_failed,
                "Run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Evaluation aborted");
            // Workspace guard drops here and releases the scratch state
            Err(e)
        }
    }
}

/// Completes when SIGINT or SIGTERM arrives. A plain `kill` takes SIGTERM's
/// default action (no Drop runs), so both signals are caught and routed
/// through the same cleanup path.
async fn shutdown_signal() {
    let mut sigterm = signal::unix::signal(SignalKind::terminate())
        .expect("failed to install SIGTERM signal handler");

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}
