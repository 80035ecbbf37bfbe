//! Suite results

use std::iter::Sum;

/// Outcome of one suite run or one contract test file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteRunResult {
    pub failure_count: usize,
    pub pass_count: usize,
}

impl SuiteRunResult {
    pub fn new(pass_count: usize, failure_count: usize) -> Self {
        Self {
            failure_count,
            pass_count,
        }
    }

    pub fn failures(failure_count: usize) -> Self {
        Self::new(0, failure_count)
    }
}

/// Sum over every result of a run; zero failures is the only success
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalResult {
    pub failure_count: usize,
    pub pass_count: usize,
}

impl TotalResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

impl<'a> Sum<&'a SuiteRunResult> for TotalResult {
    fn sum<I: Iterator<Item = &'a SuiteRunResult>>(iter: I) -> Self {
        iter.fold(TotalResult::default(), |total, result| TotalResult {
            failure_count: total.failure_count + result.failure_count,
            pass_count: total.pass_count + result.pass_count,
        })
    }
}
