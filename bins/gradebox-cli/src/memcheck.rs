/// Memory Auditor - Leak Severity via an External Checker
///
/// Delegates one execution of the artifact to valgrind's memcheck with full
/// leak detection and scrapes its log for the "definitely lost" byte figure.
/// Only the first test case's input is fed to the checker; one audited path
/// stands in for the whole suite. The mapping to a score is a deliberately
/// coarse, monotonic step function over severity bands, not a precise count.

use std::path::Path;
use std::process::Stdio;

use gradebox_common::config::EvalLimits;
use gradebox_common::types::TestSuite;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run the memory audit and map leaked bytes into a score in {0, 25, 75, 100}.
/// A suite with no test cases is vacuously clean. The checker log is removed
/// after every audit regardless of outcome.
pub async fn audit(limits: &EvalLimits, artifact: &Path, suite: &TestSuite) -> f32 {
    let Some(first_test) = suite.test_cases.first() else {
        return 100.0;
    };

    let mut cmd = Command::new("valgrind");
    cmd.arg("--tool=memcheck")
        .arg("--leak-check=full")
        .arg(format!("--log-file={}", limits.memcheck_log_path.display()))
        .arg(artifact)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "could not launch valgrind");
            return 0.0;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(first_test.input.as_bytes()).await;
        let _ = stdin.write_all(b"\n").await;
    }

    // Same kill-and-reap discipline as the sandboxed runner: a hanging
    // artifact must not stall the audit forever.
    match tokio::time::timeout(limits.memcheck_timeout, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(status = ?status.code(), "valgrind finished");
        }
        Ok(Err(e)) => {
            warn!(error = %e, "failed to await valgrind");
        }
        Err(_) => {
            warn!("valgrind exceeded its deadline, killing it");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill valgrind");
            }
        }
    }

    let score = match std::fs::read_to_string(&limits.memcheck_log_path) {
        Ok(log) => {
            let leaked = parse_definitely_lost(&log);
            debug!(leaked_bytes = leaked, "Parsed memcheck log");
            score_leaked_bytes(leaked)
        }
        Err(e) => {
            warn!(error = %e, "could not read memcheck log");
            0.0
        }
    };

    // The log is a transient side artifact
    let _ = std::fs::remove_file(&limits.memcheck_log_path);

    score
}

/// Extract the "definitely lost: N bytes" figure from a memcheck log.
/// A missing or unparseable marker counts as 0 bytes lost. Valgrind prints
/// thousands separators ("1,024 bytes"), so commas in the figure are
/// accepted.
pub fn parse_definitely_lost(log: &str) -> u64 {
    for line in log.lines() {
        if let Some(rest) = line.split("definitely lost:").nth(1) {
            let digits: String = rest
                .chars()
                .skip_while(|c| c.is_whitespace())
                .take_while(|c| c.is_ascii_digit() || *c == ',')
                .filter(|c| c.is_ascii_digit())
                .collect();
            return digits.parse().unwrap_or(0);
        }
    }
    0
}

/// Map leaked bytes into severity bands: 0 → 100, under 100 → 75,
/// under 1024 → 25, otherwise 0.
pub fn score_leaked_bytes(leaked: u64) -> f32 {
    if leaked == 0 {
        100.0
    } else if leaked < 100 {
        75.0
    } else if leaked < 1024 {
        25.0
    } else {
        0.0
    }
}
