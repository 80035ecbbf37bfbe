//! Core runner logic
//!
//! Pure data and algorithms: file classification, contract and chain data,
//! the suite context handed to script suites and result aggregation.

pub mod chain;
pub mod classifier;
pub mod context;
pub mod contract;
pub mod results;

pub use chain::{Block, Transaction};
pub use classifier::{TestFileSet, classify};
pub use context::{BeforeHook, CONTRACT_PREFIX, ContractHandle, SuiteContext};
pub use contract::{AbiEntry, AbiParam, CompiledContract, DeployedContract};
pub use results::{SuiteRunResult, TotalResult};
