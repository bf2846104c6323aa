/// Scratch workspace guard - guarantees transient state removal on every exit
/// path: normal completion, fatal error, and signal-driven early termination
/// all converge on the same release routine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gradebox_common::config::EvalLimits;
use tracing::debug;
use uuid::Uuid;

/// Uniquely named scratch directory holding the compiled artifact, plus the
/// fixed-path report and memcheck log it is responsible for sweeping up.
///
/// At most one scratch directory exists at a time; cleanup is idempotent and
/// safe to call any number of times.
#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
    report_path: PathBuf,
    memcheck_log_path: PathBuf,
    released: bool,
}

impl ScratchWorkspace {
    pub fn create(limits: &EvalLimits) -> Result<Self> {
        let root = std::env::temp_dir().join(format!("gradebox-{}", Uuid::new_v4()));
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create scratch directory {}", root.display()))?;
        debug!(scratch = %root.display(), "Created scratch workspace");
        Ok(Self {
            root,
            report_path: limits.report_path.clone(),
            memcheck_log_path: limits.memcheck_log_path.clone(),
            released: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the scratch directory and the transient report and log files.
    /// Missing files are not an error; calling this twice is a no-op.
    pub fn cleanup(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
        let _ = fs::remove_file(&self.report_path);
        let _ = fs::remove_file(&self.memcheck_log_path);
        self.released = true;
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if !self.released {
            self.cleanup();
        }
    }
}
