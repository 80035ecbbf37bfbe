//! Contract test runner library
//!
//! Discovers test files, runs them as script suites against a live node or
//! as in-VM contract tests, reports every test with its gas cost and sums
//! the failures into one outcome.

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod reporter;
pub mod runner;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{COVERAGE_GAS_LIMIT, GAS_LIMIT, Mode, TEST_TIMEOUT, TestRunRequest};
pub use crate::core::{SuiteContext, SuiteRunResult, TestFileSet, TotalResult, classify};
pub use error::{RunnerError, RunnerResult};
pub use pipeline::{ContractPipeline, ScriptPipeline};
pub use reporter::{ApiReporter, Output, RunnerEvent, SpecReporter};
pub use runner::TestRunner;
pub use traits::{
    ChainClient, ClientProvider, ContractTestEngine, ContractToolchain, CoverageReporter, FileSystem, ModePipeline,
    SuiteRunner,
};
