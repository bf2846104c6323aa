/// Integration tests for the sandboxed execution engine
///
/// These tests verify the process-lifecycle guarantees end to end:
/// 1. Clean exits are captured with their output
/// 2. Crashes, spawn failures, and timeouts are classified correctly
/// 3. The wall-clock deadline is honored and timed-out children are reaped
/// 4. The robustness probe scores graceful and unresponsive artifacts
/// 5. The full pipeline produces the expected scores over a real artifact
///
/// Artifacts are small shell scripts so no compiler toolchain is needed.

#[cfg(test)]
mod engine_tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    use gradebox_common::config::EvalLimits;
    use gradebox_common::types::{EvalMetrics, ExecutionOutcome, TestCase, TestSuite};
    use uuid::Uuid;

    use crate::executor::run_evaluation;
    use crate::probe::probe;
    use crate::sandbox::run_artifact;
    use crate::scoring::evaluate_suite;

    /// Scratch limits with deadlines shrunk to test scale.
    fn test_limits() -> EvalLimits {
        let tag = Uuid::new_v4();
        EvalLimits {
            wall_timeout: Duration::from_millis(400),
            sigint_settle: Duration::from_millis(50),
            interrupt_grace: Duration::from_millis(500),
            memcheck_timeout: Duration::from_secs(5),
            report_path: std::env::temp_dir().join(format!("gradebox-it-report-{tag}.json")),
            memcheck_log_path: std::env::temp_dir().join(format!("gradebox-it-log-{tag}.txt")),
            ..Default::default()
        }
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gradebox-it-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Test: a clean exit returns Completed with the captured output.
    #[tokio::test]
    async fn test_completed_run_captures_output() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "echoer", "#!/bin/sh\ncat\n");

        let outcome = run_artifact(&test_limits(), &artifact, "2 3").await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "2 3".to_string(),
                exit_code: 0
            }
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: stderr is merged into the captured output stream.
    #[tokio::test]
    async fn test_stderr_merged_into_output() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "noisy", "#!/bin/sh\necho out\necho err >&2\n");

        let outcome = run_artifact(&test_limits(), &artifact, "").await;
        match outcome {
            ExecutionOutcome::Completed { stdout, .. } => {
                assert!(stdout.contains("out"));
                assert!(stdout.contains("err"));
            }
            other => panic!("expected Completed, got {other:?}"),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: output capture is capped at `output_capacity - 1` bytes; a
    /// flooding child is still classified normally.
    #[tokio::test]
    async fn test_output_capture_is_bounded() {
        let dir = scratch_dir();
        let artifact = write_script(
            &dir,
            "flooder",
            "#!/bin/sh\nhead -c 20000 /dev/zero | tr '\\0' 'x'\n",
        );

        let limits = test_limits();
        let outcome = run_artifact(&limits, &artifact, "").await;
        match outcome {
            ExecutionOutcome::Completed { stdout, .. } => {
                assert_eq!(stdout.len(), limits.output_capacity - 1);
                assert!(stdout.bytes().all(|b| b == b'x'));
            }
            other => panic!("expected Completed, got {other:?}"),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: non-zero exit is classified as Crashed.
    #[tokio::test]
    async fn test_nonzero_exit_is_crashed() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "crasher", "#!/bin/sh\nexit 3\n");

        let outcome = run_artifact(&test_limits(), &artifact, "").await;
        assert!(matches!(outcome, ExecutionOutcome::Crashed { .. }), "got {outcome:?}");

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: exit 127 is the distinguished "failed to start" code.
    #[tokio::test]
    async fn test_exit_127_is_spawn_failure() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "no-exec", "#!/bin/sh\nexit 127\n");

        let outcome = run_artifact(&test_limits(), &artifact, "").await;
        assert!(matches!(outcome, ExecutionOutcome::SpawnFailed { .. }), "got {outcome:?}");

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: a path that cannot be spawned at all is SpawnFailed.
    #[tokio::test]
    async fn test_missing_artifact_is_spawn_failure() {
        let outcome = run_artifact(
            &test_limits(),
            Path::new("/nonexistent/gradebox-artifact"),
            "",
        )
        .await;
        assert!(matches!(outcome, ExecutionOutcome::SpawnFailed { .. }), "got {outcome:?}");
    }

    /// Test: a hanging artifact is classified TimedOut within the deadline
    /// plus scheduling slack, never indefinitely.
    #[tokio::test]
    async fn test_hanging_artifact_times_out() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "hang", "#!/bin/sh\nexec sleep 30\n");

        let limits = test_limits();
        let started = Instant::now();
        let outcome = run_artifact(&limits, &artifact, "").await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert!(
            elapsed < limits.wall_timeout + Duration::from_millis(500),
            "deadline overrun: {elapsed:?}"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: timed-out children are reaped; repeated runs do not accumulate
    /// stray processes or descriptors.
    #[tokio::test]
    async fn test_repeated_timeouts_leave_nothing_behind() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "hang", "#!/bin/sh\nexec sleep 30\n");

        let limits = test_limits();
        for _ in 0..3 {
            let outcome = run_artifact(&limits, &artifact, "").await;
            assert_eq!(outcome, ExecutionOutcome::TimedOut);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: an artifact that exits on SIGINT scores 100.
    #[tokio::test]
    async fn test_probe_graceful_artifact_scores_100() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "graceful", "#!/bin/sh\nexec sleep 30\n");

        let score = probe(&test_limits(), &artifact).await;
        assert_eq!(score, 100.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: an artifact that ignores SIGINT scores 0 and is forcibly
    /// terminated within the grace window plus slack.
    #[tokio::test]
    async fn test_probe_unresponsive_artifact_scores_0() {
        let dir = scratch_dir();
        let artifact = write_script(
            &dir,
            "stubborn",
            "#!/bin/sh\ntrap '' INT\nwhile :; do sleep 1; done\n",
        );

        let limits = test_limits();
        let started = Instant::now();
        let score = probe(&limits, &artifact).await;
        let elapsed = started.elapsed();

        assert_eq!(score, 0.0);
        assert!(
            elapsed < limits.sigint_settle + limits.interrupt_grace + Duration::from_millis(500),
            "probe overran its window: {elapsed:?}"
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: SIGTERM is observed by the shutdown future, so a plain `kill`
    /// routes through the cleanup path instead of the default process kill.
    #[tokio::test]
    async fn test_sigterm_triggers_shutdown_path() {
        let shutdown = tokio::spawn(crate::shutdown_signal());
        // Let the spawned future install its handlers before signalling
        tokio::time::sleep(Duration::from_millis(100)).await;

        // SAFETY: our own pid; the handler installed above replaces the
        // default terminate action for the test process.
        unsafe {
            libc::kill(libc::getpid(), libc::SIGTERM);
        }

        tokio::time::timeout(Duration::from_secs(2), shutdown)
            .await
            .expect("SIGTERM was not observed by the shutdown future")
            .unwrap();
    }

    /// Test: suite order is preserved and mixed outcomes are tallied
    /// incrementally into the metrics.
    #[tokio::test]
    async fn test_evaluate_suite_mixed_outcomes() {
        let dir = scratch_dir();
        let artifact = write_script(&dir, "echoer", "#!/bin/sh\ncat\n");

        let suite = TestSuite {
            test_cases: vec![
                TestCase {
                    input: "hello".to_string(),
                    expected_output: "hello".to_string(),
                    description: "echo".to_string(),
                    category: "normal".to_string(),
                    weight: 1.0,
                },
                TestCase {
                    input: "hello".to_string(),
                    expected_output: "goodbye".to_string(),
                    description: "mismatch".to_string(),
                    category: "normal".to_string(),
                    weight: 1.0,
                },
            ],
            ..Default::default()
        };

        let mut metrics = EvalMetrics::default();
        evaluate_suite(&test_limits(), &artifact, &suite, &mut metrics).await;

        assert_eq!(metrics.tests_passed, 1);
        assert_eq!(metrics.tests_failed, 1);
        assert_eq!(metrics.passrate, 50.0);
        assert_eq!(metrics.failed_test_details.len(), 1);
        assert!(metrics.failed_test_details[0].contains("Expected 'goodbye', Got 'hello'"));

        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: end-to-end pipeline over a summing artifact. Two passing tests
    /// yield 100% on both rates; the report lands at the configured path.
    #[tokio::test]
    async fn test_end_to_end_summing_artifact() {
        let dir = scratch_dir();
        // The "source" is already runnable; the fake toolchain just copies it
        // into the artifact slot (argv: -o artifact source -lm)
        let fake_cc = write_script(&dir, "fake-cc", "#!/bin/sh\ncp \"$3\" \"$2\"\n");
        let source = write_script(&dir, "sum.src", "#!/bin/sh\nread a b\necho $((a + b))\n");

        let mut limits = test_limits();
        limits.compiler = fake_cc.display().to_string();

        let suite = TestSuite {
            program_description: "sums two integers".to_string(),
            program_type: "arithmetic".to_string(),
            difficulty_level: "easy".to_string(),
            test_cases: vec![
                TestCase {
                    input: "2 3\n".to_string(),
                    expected_output: "5".to_string(),
                    description: "basic sum".to_string(),
                    category: "normal".to_string(),
                    weight: 1.0,
                },
                TestCase {
                    input: "0 0\n".to_string(),
                    expected_output: "0".to_string(),
                    description: "zeros".to_string(),
                    category: "edge".to_string(),
                    weight: 1.0,
                },
            ],
            potential_edge_cases: vec!["negative numbers".to_string()],
        };

        let metrics = run_evaluation(&limits, &suite, &dir, &source).await.unwrap();

        assert_eq!(metrics.passrate, 100.0);
        assert_eq!(metrics.weighted_score, 100.0);
        assert_eq!(metrics.tests_passed, 2);
        assert_eq!(metrics.tests_failed, 0);
        assert!(metrics.failed_test_details.is_empty());

        // The report was written with the same figures
        let raw = fs::read_to_string(&limits.report_path).unwrap();
        let report: gradebox_common::report::EvalReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(report.passrate, 100.0);
        assert_eq!(report.total_tests, 2);
        assert_eq!(report.potential_edge_cases, vec!["negative numbers"]);

        let _ = fs::remove_file(&limits.report_path);
        fs::remove_dir_all(&dir).unwrap();
    }

    /// Test: compilation failure writes a zeroed report and fails the run.
    #[tokio::test]
    async fn test_compile_failure_writes_zeroed_report() {
        let dir = scratch_dir();
        let mut limits = test_limits();
        limits.compiler = "false".to_string();

        let suite = TestSuite {
            program_description: "never compiles".to_string(),
            test_cases: vec![TestCase {
                input: String::new(),
                expected_output: String::new(),
                description: "unreached".to_string(),
                category: "normal".to_string(),
                weight: 1.0,
            }],
            ..Default::default()
        };

        let result = run_evaluation(&limits, &suite, &dir, Path::new("broken.c")).await;
        assert!(result.is_err());

        let raw = fs::read_to_string(&limits.report_path).unwrap();
        let report: gradebox_common::report::EvalReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(report.passrate, 0.0);
        assert_eq!(report.weighted_score, 0.0);
        assert_eq!(report.memory_score, 0.0);
        assert_eq!(report.robustness_score, 0.0);
        assert_eq!(report.program_description, "never compiles");

        let _ = fs::remove_file(&limits.report_path);
        fs::remove_dir_all(&dir).unwrap();
    }
}
