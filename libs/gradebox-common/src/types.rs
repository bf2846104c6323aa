use serde::{Deserialize, Serialize};

/// Hard ceiling on the number of test cases kept from a test definition.
/// Excess entries are silently dropped, never an error.
pub const MAX_TESTS: usize = 20;

/// Byte ceilings on untrusted strings loaded from the test definition.
/// Oversized values are truncated on load so worst-case memory stays fixed.
pub const MAX_INPUT_BYTES: usize = 1024;
pub const MAX_EXPECTED_OUTPUT_BYTES: usize = 1024;
pub const MAX_DESCRIPTION_BYTES: usize = 256;
pub const MAX_CATEGORY_BYTES: usize = 32;

/// Ceiling on retained failure-detail strings in the metrics.
pub const MAX_FAILURE_DETAILS: usize = 20;

fn default_weight() -> f32 {
    1.0
}

/// One externally supplied test case. Immutable once the suite is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub description: String,
    /// Free-form label: normal, edge, error, corner.
    #[serde(default)]
    pub category: String,
    /// Importance weight for the weighted pass rate. Defaults to 1.0.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

/// Ordered test suite plus program metadata, loaded once at startup and
/// read-only thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub program_description: String,
    #[serde(default)]
    pub program_type: String,
    #[serde(default)]
    pub difficulty_level: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Free-text hints echoed back into the final report.
    #[serde(default)]
    pub potential_edge_cases: Vec<String>,
}

impl TestSuite {
    /// Enforce the fixed-size bounds after deserialization: drop test cases
    /// beyond [`MAX_TESTS`] and truncate every untrusted string to its byte
    /// ceiling.
    pub fn clamp_to_bounds(&mut self) {
        self.test_cases.truncate(MAX_TESTS);
        self.potential_edge_cases.truncate(MAX_TESTS);

        for test in &mut self.test_cases {
            truncate_utf8(&mut test.input, MAX_INPUT_BYTES);
            truncate_utf8(&mut test.expected_output, MAX_EXPECTED_OUTPUT_BYTES);
            truncate_utf8(&mut test.description, MAX_DESCRIPTION_BYTES);
            truncate_utf8(&mut test.category, MAX_CATEGORY_BYTES);
        }
        for hint in &mut self.potential_edge_cases {
            truncate_utf8(hint, MAX_DESCRIPTION_BYTES);
        }
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
fn truncate_utf8(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Classification of a single sandboxed run. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Clean exit; `stdout` holds the merged stdout/stderr bytes captured
    /// from the child, bounded by the configured output capacity.
    Completed { stdout: String, exit_code: i32 },
    /// The wall-clock deadline expired and the child was forcibly killed.
    TimedOut,
    /// Non-zero exit or signal death.
    Crashed { detail: String },
    /// Process creation or image replacement failed.
    SpawnFailed { detail: String },
}

/// Mutable scoring accumulator, owned by the single control thread and
/// finalized once before serialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalMetrics {
    pub passrate: f32,
    pub weighted_score: f32,
    pub memory_score: f32,
    pub robustness_score: f32,
    pub execution_time_ms: u64,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub failed_test_details: Vec<String>,
}

impl EvalMetrics {
    /// Record a human-readable failure detail, bounded to
    /// [`MAX_FAILURE_DETAILS`] retained entries.
    pub fn record_failure_detail(&mut self, detail: String) {
        if self.failed_test_details.len() < MAX_FAILURE_DETAILS {
            self.failed_test_details.push(detail);
        }
    }
}
