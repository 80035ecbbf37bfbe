//! Trait definitions with mockall annotations for testing
//!
//! The runner consumes the chain, the contract toolchain and the test
//! engines through these seams only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::TestRunRequest;
use crate::core::{Block, CompiledContract, DeployedContract, SuiteContext, SuiteRunResult};
use crate::error::RunnerResult;
use crate::reporter::RunnerEvent;

/// Live connection to the node under test
#[mockall::automock]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    async fn accounts(&self) -> RunnerResult<Vec<String>>;

    /// Number of the latest block
    async fn block_number(&self) -> RunnerResult<u64>;

    /// `None` when the node does not know the block (yet)
    async fn block_by_number(&self, number: u64) -> RunnerResult<Option<Block>>;
}

/// Hands out the client connection of the running node
#[mockall::automock]
#[async_trait::async_trait]
pub trait ClientProvider: Send + Sync {
    async fn client(&self) -> RunnerResult<Arc<dyn ChainClient>>;
}

/// Compiler and deployer of the project's contracts
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContractToolchain: Send + Sync {
    /// Contract sources registered for this project
    async fn contract_files(&self) -> RunnerResult<Vec<PathBuf>>;

    async fn compile(&self, files: &[PathBuf]) -> RunnerResult<Vec<CompiledContract>>;

    async fn deploy(&self, contracts: &[CompiledContract], gas_limit: u64) -> RunnerResult<()>;

    /// Contracts deployed so far, latest deployment per class
    async fn list_contracts(&self) -> RunnerResult<Vec<DeployedContract>>;

    /// Add sources on top of the project's own until the next reset
    async fn register_contract_files(&self, files: &[PathBuf]) -> RunnerResult<()>;

    /// Forget contract files registered by the contract test engine
    async fn reset_contract_files(&self) -> RunnerResult<()>;
}

/// Executes script test files
#[mockall::automock]
#[async_trait::async_trait]
pub trait SuiteRunner: Send + Sync {
    /// Run every file as one suite run; lifecycle events go to `events`
    ///
    /// Implementations call `SuiteContext::run_before` before the first test.
    async fn run(
        &self,
        files: &[PathBuf],
        context: SuiteContext,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunnerResult<SuiteRunResult>;
}

/// In-VM engine for `_test.sol` files
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContractTestEngine: Send + Sync {
    async fn init(&self) -> RunnerResult<()>;

    async fn setup_tests(&self, files: &[PathBuf]) -> RunnerResult<()>;

    async fn run_tests(&self, file: &Path) -> RunnerResult<Vec<SuiteRunResult>>;
}

/// One execution mode of the runner
#[mockall::automock]
#[async_trait::async_trait]
pub trait ModePipeline: Send + Sync {
    /// Results per suite run or per file
    async fn run(&self, files: &[PathBuf], request: &TestRunRequest) -> RunnerResult<Vec<SuiteRunResult>>;
}

/// Coverage report generation
#[mockall::automock]
#[async_trait::async_trait]
pub trait CoverageReporter: Send + Sync {
    /// Generate the report and return the path of its entry page
    async fn generate(&self) -> RunnerResult<PathBuf>;

    async fn open(&self, report: &Path) -> RunnerResult<()>;
}

/// Project file access
#[mockall::automock]
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Every file under `root`, depth-first in sorted order
    ///
    /// A file root yields itself; a missing root is an input error.
    async fn list_files(&self, root: &Path) -> RunnerResult<Vec<PathBuf>>;

    /// Remove transient build artifacts left behind by a run
    async fn remove_artifacts(&self) -> RunnerResult<()>;
}
