//! Common test utilities and infrastructure
//!
//! Shared fixtures and helpers used across the runner test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::{FakeCoverage, FakeEngine, FakeProvider, FakeToolchain, ScriptedSuites, TestFixtures};
pub use helpers::{RunnerBuilder, TestHelpers};
