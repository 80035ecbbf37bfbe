//! Service implementations
//!
//! Real implementations of the runner's collaborator traits. These talk to
//! the node, the compiler and external test tools.

pub mod blocks;
pub mod coverage;
pub mod engine;
pub mod file_system;
pub mod rpc;
pub mod solc;
pub mod suite;

#[cfg(test)]
mod tests;

pub use blocks::BlockWatcher;
pub use coverage::IstanbulCoverage;
pub use engine::CommandContractEngine;
pub use file_system::RealFileSystem;
pub use rpc::{JsonRpcClient, RpcClientProvider};
pub use solc::SolcToolchain;
pub use suite::CommandSuiteRunner;
