//! Final results report, written once at the end of an evaluation (or once,
//! zeroed, on compilation failure).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EvalMetrics, TestSuite};

/// The structured report consumed downstream. Scores are always present:
/// "evaluation completed" is distinct from "program under test passed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub program_description: String,
    pub program_type: String,
    pub difficulty_level: String,
    pub passrate: f32,
    pub weighted_score: f32,
    pub memory_score: f32,
    pub robustness_score: f32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub total_tests: usize,
    pub execution_time_ms: u64,
    pub failed_test_details: Vec<String>,
    /// Edge-case hints echoed back from the test definition.
    pub potential_edge_cases: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl EvalReport {
    pub fn from_metrics(suite: &TestSuite, metrics: &EvalMetrics) -> Self {
        Self {
            program_description: suite.program_description.clone(),
            program_type: suite.program_type.clone(),
            difficulty_level: suite.difficulty_level.clone(),
            passrate: metrics.passrate,
            weighted_score: metrics.weighted_score,
            memory_score: metrics.memory_score,
            robustness_score: metrics.robustness_score,
            tests_passed: metrics.tests_passed,
            tests_failed: metrics.tests_failed,
            total_tests: suite.test_cases.len(),
            execution_time_ms: metrics.execution_time_ms,
            failed_test_details: metrics.failed_test_details.clone(),
            potential_edge_cases: suite.potential_edge_cases.clone(),
            generated_at: Utc::now(),
        }
    }

    /// Report for a run that never got past compilation: all scores zero,
    /// metadata and hints still echoed.
    pub fn zeroed(suite: &TestSuite) -> Self {
        Self::from_metrics(suite, &EvalMetrics::default())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestCase;

    fn sample_suite() -> TestSuite {
        TestSuite {
            program_description: "sums two integers".to_string(),
            program_type: "arithmetic".to_string(),
            difficulty_level: "easy".to_string(),
            test_cases: vec![TestCase {
                input: "2 3".to_string(),
                expected_output: "5".to_string(),
                description: "basic sum".to_string(),
                category: "normal".to_string(),
                weight: 1.0,
            }],
            potential_edge_cases: vec!["integer overflow".to_string()],
        }
    }

    #[test]
    fn test_zeroed_report_keeps_metadata() {
        let report = EvalReport::zeroed(&sample_suite());
        assert_eq!(report.program_description, "sums two integers");
        assert_eq!(report.passrate, 0.0);
        assert_eq!(report.weighted_score, 0.0);
        assert_eq!(report.memory_score, 0.0);
        assert_eq!(report.robustness_score, 0.0);
        assert_eq!(report.total_tests, 1);
        assert_eq!(report.potential_edge_cases, vec!["integer overflow"]);
    }

    #[test]
    fn test_write_and_read_back() {
        let suite = sample_suite();
        let mut metrics = EvalMetrics {
            passrate: 100.0,
            weighted_score: 100.0,
            memory_score: 75.0,
            robustness_score: 100.0,
            execution_time_ms: 1234,
            tests_passed: 1,
            tests_failed: 0,
            ..Default::default()
        };
        metrics.record_failure_detail("none".to_string());

        let path = std::env::temp_dir().join(format!("gradebox-report-{}.json", uuid::Uuid::new_v4()));
        let report = EvalReport::from_metrics(&suite, &metrics);
        report.write(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: EvalReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.passrate, 100.0);
        assert_eq!(parsed.memory_score, 75.0);
        assert_eq!(parsed.execution_time_ms, 1234);
        assert_eq!(parsed.failed_test_details, vec!["none"]);

        fs::remove_file(&path).unwrap();
    }
}
