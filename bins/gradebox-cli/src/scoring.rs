/// Scoring Aggregator - Language-Agnostic Correctness Scoring
///
/// **Core Responsibility:**
/// Compare sandboxed run outcomes against expected outputs and accumulate
/// simple and weight-adjusted pass rates.
///
/// **Critical Properties:**
/// - Knows nothing about pipes, rlimits, or process reaping
/// - The accumulation over collected outcomes is a pure function:
///   (outcomes, suite) → metrics
///
/// **Normalization Rules:**
/// - Trailing whitespace (space, tab, newline, carriage return) is stripped
///   from captured output before comparison
/// - Nothing else is normalized: comparison is otherwise byte-exact

use std::path::Path;

use gradebox_common::config::EvalLimits;
use gradebox_common::types::{EvalMetrics, ExecutionOutcome, TestCase, TestSuite};
use tracing::debug;

use crate::sandbox;

/// Verdict for a single test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestVerdict {
    Passed,
    /// Clean exit, but post-trim output differed from the expected string.
    WrongOutput,
    /// Timeout, crash, or spawn failure; no output comparison happened.
    ExecutionError,
}

/// Strip trailing whitespace from captured output before comparison.
fn trim_trailing_whitespace(output: &str) -> &str {
    output.trim_end_matches([' ', '\t', '\n', '\r'])
}

/// Judge one outcome against one test case.
pub fn judge_outcome(outcome: &ExecutionOutcome, test: &TestCase) -> TestVerdict {
    match outcome {
        ExecutionOutcome::Completed { stdout, .. } => {
            if trim_trailing_whitespace(stdout) == test.expected_output {
                TestVerdict::Passed
            } else {
                TestVerdict::WrongOutput
            }
        }
        // Timeouts, crashes, and spawn failures all count as failed with no
        // distinction surfaced into the tally
        ExecutionOutcome::TimedOut
        | ExecutionOutcome::Crashed { .. }
        | ExecutionOutcome::SpawnFailed { .. } => TestVerdict::ExecutionError,
    }
}

/// Accumulate pass counts, both pass rates, and bounded failure details from
/// already-collected outcomes. Pure: no processes, no IO.
pub fn score_outcomes(suite: &TestSuite, outcomes: &[ExecutionOutcome], metrics: &mut EvalMetrics) {
    metrics.tests_passed = 0;
    metrics.tests_failed = 0;
    metrics.failed_test_details.clear();

    let mut total_weight = 0.0f32;
    let mut passed_weight = 0.0f32;

    for (i, (test, outcome)) in suite.test_cases.iter().zip(outcomes).enumerate() {
        total_weight += test.weight;

        match judge_outcome(outcome, test) {
            TestVerdict::Passed => {
                metrics.tests_passed += 1;
                passed_weight += test.weight;
            }
            TestVerdict::WrongOutput => {
                metrics.tests_failed += 1;
                let got = match outcome {
                    ExecutionOutcome::Completed { stdout, .. } => trim_trailing_whitespace(stdout),
                    _ => "",
                };
                metrics.record_failure_detail(format!(
                    "Test {} ({}): Expected '{}', Got '{}'",
                    i + 1,
                    test.description,
                    test.expected_output,
                    got
                ));
            }
            TestVerdict::ExecutionError => {
                metrics.tests_failed += 1;
                metrics.record_failure_detail(format!(
                    "Test {} ({}): Execution timeout or error",
                    i + 1,
                    test.description
                ));
            }
        }
    }

    let total = suite.test_cases.len();
    metrics.passrate = if total > 0 {
        metrics.tests_passed as f32 / total as f32 * 100.0
    } else {
        0.0
    };
    metrics.weighted_score = if total_weight > 0.0 {
        passed_weight / total_weight * 100.0
    } else {
        0.0
    };
}

/// Run the full suite in stored order, one sandboxed trial per test, report
/// pass/fail incrementally, and fill in the correctness metrics.
///
/// Exactly one sandboxed child is alive at a time; tests never run
/// concurrently with one another.
pub async fn evaluate_suite(
    limits: &EvalLimits,
    artifact: &Path,
    suite: &TestSuite,
    metrics: &mut EvalMetrics,
) {
    println!("  Running {} test cases:", suite.test_cases.len());

    let mut outcomes = Vec::with_capacity(suite.test_cases.len());

    for (i, test) in suite.test_cases.iter().enumerate() {
        println!("  Test {} [{}]: {}", i + 1, test.category, test.description);

        let outcome = sandbox::run_artifact(limits, artifact, &test.input).await;
        debug!(test_num = i + 1, outcome = ?outcome, "Sandboxed run finished");

        match judge_outcome(&outcome, test) {
            TestVerdict::Passed => println!("    ✓ PASS"),
            TestVerdict::WrongOutput => {
                if let ExecutionOutcome::Completed { stdout, .. } = &outcome {
                    println!(
                        "    ✗ FAIL - Expected: '{}', Got: '{}'",
                        test.expected_output,
                        trim_trailing_whitespace(stdout)
                    );
                }
            }
            TestVerdict::ExecutionError => {
                println!("    ✗ FAIL - Timeout or execution error");
            }
        }

        outcomes.push(outcome);
    }

    score_outcomes(suite, &outcomes, metrics);
}
