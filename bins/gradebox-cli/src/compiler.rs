/// Compiler Collaborator - External Black-Box Build Step
///
/// The toolchain is invoked once per evaluation; success means "process
/// exited zero and the artifact exists". Anything else is a fatal
/// compilation failure for the whole run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use gradebox_common::config::EvalLimits;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the build output inside the scratch directory.
pub const ARTIFACT_NAME: &str = "user_program";

/// Compile `source` into `<scratch>/user_program` and return the artifact
/// path.
pub async fn compile_source(
    limits: &EvalLimits,
    source: &Path,
    scratch_dir: &Path,
) -> Result<PathBuf> {
    let artifact = scratch_dir.join(ARTIFACT_NAME);

    debug!(
        compiler = %limits.compiler,
        source = %source.display(),
        artifact = %artifact.display(),
        "Invoking compiler"
    );

    let output = Command::new(&limits.compiler)
        .arg("-o")
        .arg(&artifact)
        .arg(source)
        .arg("-lm")
        .output()
        .await
        .with_context(|| format!("failed to invoke compiler '{}'", limits.compiler))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "compiler exited with {}: {}",
            output.status,
            stderr.lines().next().unwrap_or("(no diagnostics)")
        );
    }

    if !artifact.exists() {
        bail!("compiler reported success but produced no artifact");
    }

    info!(artifact = %artifact.display(), "Compilation succeeded");
    Ok(artifact)
}
