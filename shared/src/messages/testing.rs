//! Per-test result reports published while a suite runs

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestState {
    Passed,
    Failed,
    Pending,
}

/// One finished test, with the titles of its enclosing suites
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TestReport {
    pub suite: Vec<String>,
    pub title: String,
    pub file: Option<String>,
    pub duration_ms: Option<u64>,
    pub state: TestState,
    pub speed: Option<String>,
}
