//! Common test utilities and infrastructure
//!
//! Shared fixtures and helpers used across the supervisor test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::{FakeFactory, FakeNodeProcess, TestFixtures};
pub use helpers::{SupervisorBuilder, TestHelpers};
