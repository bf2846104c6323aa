/// Robustness Prober - Graceful Interrupt Check
///
/// A single binary signal: spawn the artifact with default stdio and no
/// arguments, let it reach a steady state, deliver SIGINT, and see whether it
/// terminates within the grace window. This exercises exactly one path -
/// response to an interrupt - and nothing else.

use std::path::Path;

use gradebox_common::config::EvalLimits;
use tokio::process::Command;
use tracing::{debug, warn};

/// Probe the artifact's response to SIGINT. Returns 100.0 for a termination
/// within the grace window, 0.0 for a hang (the child is then SIGKILLed and
/// reaped, never leaked).
pub async fn probe(limits: &EvalLimits, artifact: &Path) -> f32 {
    let mut child = match Command::new(artifact).kill_on_drop(true).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "robustness probe could not spawn artifact");
            return 0.0;
        }
    };

    // Let the program reach a steady state (blocked on input or looping)
    // before interrupting it.
    tokio::time::sleep(limits.sigint_settle).await;

    if let Some(pid) = child.id() {
        debug!(pid, "Delivering SIGINT to probed artifact");
        // SAFETY: pid belongs to our un-reaped child, so it cannot have been
        // recycled.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGINT);
        }
    }

    match tokio::time::timeout(limits.interrupt_grace, child.wait()).await {
        Ok(Ok(_)) => 100.0,
        Ok(Err(e)) => {
            // Losing track of the child is not evidence of a graceful exit
            warn!(error = %e, "failed to await probed artifact");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill unobservable artifact");
            }
            0.0
        }
        Err(_) => {
            warn!(
                grace_ms = limits.interrupt_grace.as_millis() as u64,
                "Artifact ignored SIGINT, killing it"
            );
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill unresponsive artifact");
            }
            0.0
        }
    }
}
