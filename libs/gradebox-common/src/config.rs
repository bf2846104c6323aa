// Evaluation limits and fixed paths, constructed once at startup and passed
// by reference into every component.

use std::path::PathBuf;
use std::time::Duration;

/// Resource ceilings, deadlines, and transient paths for one evaluation run.
///
/// This replaces process-wide mutable state: the pipeline builds one value in
/// `main`, CLI overrides are applied there, and everything downstream reads it
/// immutably.
#[derive(Debug, Clone)]
pub struct EvalLimits {
    /// Address-space ceiling for the sandboxed child (RLIMIT_AS), MiB.
    pub memory_limit_mb: u64,
    /// CPU-time ceiling for the sandboxed child (RLIMIT_CPU), seconds.
    pub cpu_time_limit_s: u64,
    /// Wall-clock deadline per sandboxed run; the child is SIGKILLed past it.
    pub wall_timeout: Duration,
    /// Output capture ceiling in bytes per run.
    pub output_capacity: usize,
    /// Delay before the robustness probe delivers SIGINT.
    pub sigint_settle: Duration,
    /// Window in which a probed child must exit after SIGINT.
    pub interrupt_grace: Duration,
    /// Wall-clock deadline for the external memory checker.
    pub memcheck_timeout: Duration,
    /// Compiler program invoked as `<compiler> -o <artifact> <source> -lm`.
    pub compiler: String,
    /// Where the results report is written.
    pub report_path: PathBuf,
    /// Where the memory checker writes its log.
    pub memcheck_log_path: PathBuf,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            memory_limit_mb: 64,
            cpu_time_limit_s: 2,
            wall_timeout: Duration::from_secs(5),
            output_capacity: 4096,
            sigint_settle: Duration::from_millis(200),
            interrupt_grace: Duration::from_secs(1),
            memcheck_timeout: Duration::from_secs(30),
            compiler: "gcc".to_string(),
            report_path: PathBuf::from("/tmp/gradebox_results.json"),
            memcheck_log_path: PathBuf::from("/tmp/gradebox_memcheck.log"),
        }
    }
}
