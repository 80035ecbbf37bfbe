//! Execution modes of a test run
//!
//! A request selects exactly one mode: script suites against a live node,
//! or in-VM contract tests. Both are `ModePipeline`s so the aggregator can
//! treat them alike.

pub mod contract;
pub mod script;

pub use contract::ContractPipeline;
pub use script::ScriptPipeline;
