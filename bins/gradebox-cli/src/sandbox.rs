/// Sandboxed Runner - Execution Engine for the Untrusted Artifact
///
/// **Core Responsibility:**
/// Run one trial of the compiled artifact with piped stdin/stdout under hard
/// resource ceilings and classify how it terminated.
///
/// **Critical Architectural Boundary:**
/// - The runner knows HOW to execute (pipes, rlimits, deadline, reaping)
/// - The runner does NOT know scoring rules
/// - The runner returns a raw [`ExecutionOutcome`] for the scorer to judge
///
/// **Safety Guarantees:**
/// - Resource ceilings applied between fork and exec, in the child only
/// - Hard wall-clock deadline enforced via `tokio::time::timeout`; the child
///   is SIGKILLed and reaped on expiry, so no zombie survives any path
/// - Output capture bounded to the configured capacity, so a flooding child
///   cannot grow the parent's memory
/// - stderr is merged onto the stdout pipe so both streams drain together

use std::path::Path;
use std::process::Stdio;

use gradebox_common::config::EvalLimits;
use gradebox_common::types::ExecutionOutcome;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code that distinguishes "failed to start" from "ran and exited".
pub const EXEC_FAILURE_EXIT_CODE: i32 = 127;

/// Build the sandbox command for one trial: piped stdio plus a pre-exec hook
/// that applies the resource ceilings.
///
/// The hook runs in the forked child before the artifact image is loaded and
/// never affects the parent. Nothing in it may allocate or log: a failed
/// `setrlimit` simply leaves that ceiling unset and the run proceeds, since
/// refusing to run is worse than running unprotected. The parent logs the
/// requested ceilings beforehand.
fn sandbox_command(limits: &EvalLimits, artifact: &Path) -> Command {
    let mut cmd = Command::new(artifact);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mem_bytes = limits.memory_limit_mb * 1024 * 1024;
    let cpu_secs = limits.cpu_time_limit_s;

    debug!(
        memory_limit_mb = limits.memory_limit_mb,
        cpu_time_limit_s = cpu_secs,
        "Applying sandbox resource ceilings"
    );

    // SAFETY: the closure runs between fork and exec in the child process and
    // only calls async-signal-safe libc functions.
    unsafe {
        cmd.pre_exec(move || {
            let mem = libc::rlimit {
                rlim_cur: mem_bytes,
                rlim_max: mem_bytes,
            };
            libc::setrlimit(libc::RLIMIT_AS, &mem);

            let cpu = libc::rlimit {
                rlim_cur: cpu_secs,
                rlim_max: cpu_secs,
            };
            libc::setrlimit(libc::RLIMIT_CPU, &cpu);

            // Merge stderr onto the stdout pipe so the parent drains a single
            // output stream.
            libc::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO);
            Ok(())
        });
    }

    cmd
}

/// Run one sandboxed trial of the artifact: feed `input` on stdin, capture up
/// to `output_capacity - 1` bytes of merged output, and classify termination.
///
/// Every invocation creates and destroys two pipes and one child process;
/// no process or file descriptor leaks across invocations regardless of
/// outcome.
pub async fn run_artifact(limits: &EvalLimits, artifact: &Path, input: &str) -> ExecutionOutcome {
    let mut child = match sandbox_command(limits, artifact).spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionOutcome::SpawnFailed {
                detail: format!("failed to spawn {}: {}", artifact.display(), e),
            }
        }
    };

    // Feed the full input, then close the pipe to signal end-of-input. A
    // write error here only means the child stopped reading; classification
    // comes from the exit status.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
            debug!(error = %e, "child stopped reading stdin early");
        }
    }

    // Drain the output pipe concurrently with the wait so a chatty child can
    // never block on a full pipe. The reader is bounded: past the capacity
    // the pipe keeps draining into nothing once the child exits or is killed.
    let capacity = limits.output_capacity.saturating_sub(1) as u64;
    let reader = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.take(capacity).read_to_end(&mut buf).await;
            buf
        })
    });

    let status = match tokio::time::timeout(limits.wall_timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            // wait() itself failing means the child is no longer ours to
            // observe; kill_on_drop covers the reap.
            return ExecutionOutcome::SpawnFailed {
                detail: format!("failed to await child: {e}"),
            };
        }
        Err(_) => {
            // Deadline expired: SIGKILL, then block until the child is
            // actually reaped so no zombie is left behind.
            warn!(
                timeout_ms = limits.wall_timeout.as_millis() as u64,
                "Sandboxed run exceeded wall-clock deadline, killing child"
            );
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out child");
            }
            if let Some(reader) = reader {
                let _ = reader.await;
            }
            return ExecutionOutcome::TimedOut;
        }
    };

    let output = match reader {
        Some(reader) => reader.await.unwrap_or_default(),
        None => Vec::new(),
    };

    match status.code() {
        Some(0) => ExecutionOutcome::Completed {
            stdout: String::from_utf8_lossy(&output).into_owned(),
            exit_code: 0,
        },
        Some(EXEC_FAILURE_EXIT_CODE) => ExecutionOutcome::SpawnFailed {
            detail: format!("artifact could not be executed (exit {EXEC_FAILURE_EXIT_CODE})"),
        },
        // Output is not collected for a crashed run
        Some(code) => ExecutionOutcome::Crashed {
            detail: format!("exited with code {code}"),
        },
        None => ExecutionOutcome::Crashed {
            detail: describe_signal_death(&status),
        },
    }
}

fn describe_signal_death(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(sig) => format!("killed by signal {sig}"),
        None => "terminated abnormally".to_string(),
    }
}
