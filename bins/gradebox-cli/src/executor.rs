/// Evaluation Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Coordinate the compiler, the sandboxed runner, the memory auditor, and the
/// robustness prober to produce final metrics and write the report.
///
/// **Ordering guarantees:**
/// Compilation strictly precedes any test execution; all correctness tests
/// complete in suite order before the memory audit, which precedes the
/// robustness probe. Elapsed time is wall-clock across the whole pipeline.
///
/// This module is the glue layer - it knows nothing about:
/// - How the sandbox executes (sandbox's job)
/// - How scoring works (scoring's job)

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use gradebox_common::config::EvalLimits;
use gradebox_common::report::EvalReport;
use gradebox_common::types::{EvalMetrics, TestSuite};
use tracing::{error, info};

use crate::{compiler, memcheck, probe, scoring};

/// Run the full evaluation pipeline against an already-created scratch
/// directory and return the final metrics.
///
/// A compilation failure short-circuits straight to writing a zeroed report
/// and returns an error; every per-test failure is absorbed into the metrics
/// and the run continues to completion.
pub async fn run_evaluation(
    limits: &EvalLimits,
    suite: &TestSuite,
    scratch_dir: &Path,
    source: &Path,
) -> Result<EvalMetrics> {
    let started = Instant::now();

    println!("1. Compiling source file: {}", source.display());
    let artifact = match compiler::compile_source(limits, source, scratch_dir).await {
        Ok(artifact) => artifact,
        Err(e) => {
            println!("    ✗ Compilation failed");
            error!(error = %e, "Compilation failed");
            // The report is still written, with all scores at zero
            EvalReport::zeroed(suite)
                .write(&limits.report_path)
                .context("failed to write zeroed report")?;
            return Err(e.context("compilation failed"));
        }
    };
    println!("    ✓ Compilation successful");
    println!();

    let mut metrics = EvalMetrics::default();

    println!("2. Running correctness tests...");
    scoring::evaluate_suite(limits, &artifact, suite, &mut metrics).await;
    println!(
        "    ✓ Simple passrate: {:.1}% ({}/{} tests passed)",
        metrics.passrate,
        metrics.tests_passed,
        suite.test_cases.len()
    );
    println!("    ✓ Weighted score: {:.1}%", metrics.weighted_score);
    println!();

    println!("3. Analyzing memory with valgrind...");
    metrics.memory_score = memcheck::audit(limits, &artifact, suite).await;
    println!("    ✓ Memory score: {:.1}", metrics.memory_score);
    println!();

    println!("4. Checking robustness...");
    metrics.robustness_score = probe::probe(limits, &artifact).await;
    println!("    ✓ Robustness score: {:.1}", metrics.robustness_score);
    println!();

    metrics.execution_time_ms = started.elapsed().as_millis() as u64;

    EvalReport::from_metrics(suite, &metrics)
        .write(&limits.report_path)
        .context("failed to write results report")?;

    info!(
        passrate = metrics.passrate,
        weighted_score = metrics.weighted_score,
        memory_score = metrics.memory_score,
        robustness_score = metrics.robustness_score,
        execution_time_ms = metrics.execution_time_ms,
        "Evaluation complete"
    );

    Ok(metrics)
}
