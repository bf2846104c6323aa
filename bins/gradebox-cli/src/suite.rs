/// Test-definition loading: parse the external JSON document into a bounded,
/// read-only [`TestSuite`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gradebox_common::types::TestSuite;
use tracing::info;

/// Load and bound a test suite. Any error here is a setup failure: fatal,
/// before anything runs.
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot open test cases file: {}", path.display()))?;

    let mut suite: TestSuite =
        serde_json::from_str(&raw).context("invalid JSON in test cases file")?;
    suite.clamp_to_bounds();

    info!(
        tests = suite.test_cases.len(),
        edge_case_hints = suite.potential_edge_cases.len(),
        "Test suite loaded"
    );
    Ok(suite)
}

/// Print the loaded suite for the human running the evaluation.
pub fn print_suite_info(suite: &TestSuite) {
    println!("→ Test suite loaded");
    println!("  Program: {}", suite.program_description);
    println!("  Type: {}", suite.program_type);
    println!("  Difficulty: {}", suite.difficulty_level);
    println!("  Tests: {} test cases", suite.test_cases.len());
    if !suite.potential_edge_cases.is_empty() {
        println!("  Edge cases to consider:");
        for hint in &suite.potential_edge_cases {
            println!("    • {hint}");
        }
    }
    println!();
}
