//! Contract test mode
//!
//! Files run one at a time so gas and chain state stay isolated per file.
//! Contract-file registration made by the engine is reset afterwards,
//! whether the run succeeded or not.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use shared::{ProcessId, process_info, process_warn};

use crate::config::TestRunRequest;
use crate::core::SuiteRunResult;
use crate::error::RunnerResult;
use crate::traits::{ContractTestEngine, ContractToolchain, ModePipeline};

pub struct ContractPipeline<E, T>
where
    E: ContractTestEngine + 'static,
    T: ContractToolchain + 'static,
{
    engine: Arc<E>,
    toolchain: Arc<T>,
}

impl<E, T> ContractPipeline<E, T>
where
    E: ContractTestEngine + 'static,
    T: ContractToolchain + 'static,
{
    pub fn new(engine: Arc<E>, toolchain: Arc<T>) -> Self {
        Self { engine, toolchain }
    }

    async fn run_files(&self, files: &[PathBuf]) -> RunnerResult<Vec<SuiteRunResult>> {
        self.engine.init().await?;
        self.engine.setup_tests(files).await?;

        let mut results = Vec::new();
        for file in files {
            results.extend(self.engine.run_tests(file).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl<E, T> ModePipeline for ContractPipeline<E, T>
where
    E: ContractTestEngine + 'static,
    T: ContractToolchain + 'static,
{
    async fn run(&self, files: &[PathBuf], _request: &TestRunRequest) -> RunnerResult<Vec<SuiteRunResult>> {
        process_info!(ProcessId::current(), "Running solc tests");

        let outcome = self.run_files(files).await;
        let reset = self.toolchain.reset_contract_files().await;

        let results = outcome?;
        if let Err(e) = reset {
            process_warn!(ProcessId::current(), "⚠️ Could not reset contract files: {}", e);
            return Err(e);
        }

        let passing: usize = results.iter().map(|r| r.pass_count).sum();
        let failing: usize = results.iter().map(|r| r.failure_count).sum();
        process_info!(ProcessId::current(), "🧾 solc tests: {} passing, {} failing", passing, failing);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunnerError;
    use crate::traits::{MockContractTestEngine, MockContractToolchain};
    use assert_matches::assert_matches;
    use mockall::Sequence;

    fn toolchain_expecting_reset() -> MockContractToolchain {
        let mut toolchain = MockContractToolchain::new();
        toolchain.expect_reset_contract_files().times(1).returning(|| Ok(()));
        toolchain
    }

    #[tokio::test]
    async fn test_files_run_in_order() {
        let mut engine = MockContractTestEngine::new();
        let mut seq = Sequence::new();
        engine.expect_init().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        engine
            .expect_setup_tests()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        engine
            .expect_run_tests()
            .withf(|file| file.ends_with("a_test.sol"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![SuiteRunResult::new(2, 0)]));
        engine
            .expect_run_tests()
            .withf(|file| file.ends_with("b_test.sol"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![SuiteRunResult::new(1, 1), SuiteRunResult::new(0, 2)]));

        let pipeline = ContractPipeline::new(Arc::new(engine), Arc::new(toolchain_expecting_reset()));
        let files = vec![PathBuf::from("test/a_test.sol"), PathBuf::from("test/b_test.sol")];
        let results = pipeline.run(&files, &TestRunRequest::default()).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().map(|r| r.failure_count).sum::<usize>(), 3);
    }

    #[tokio::test]
    async fn test_reset_runs_after_engine_failure() {
        let mut engine = MockContractTestEngine::new();
        engine.expect_init().returning(|| Ok(()));
        engine
            .expect_setup_tests()
            .returning(|_| Err(RunnerError::compile("remix_tests.sol: parser error")));
        engine.expect_run_tests().never();

        let pipeline = ContractPipeline::new(Arc::new(engine), Arc::new(toolchain_expecting_reset()));
        let result = pipeline
            .run(&[PathBuf::from("test/a_test.sol")], &TestRunRequest::default())
            .await;

        assert_matches!(result, Err(RunnerError::CompileError { .. }));
    }

    #[tokio::test]
    async fn test_reset_failure_is_reported() {
        let mut engine = MockContractTestEngine::new();
        engine.expect_init().returning(|| Ok(()));
        engine.expect_setup_tests().returning(|_| Ok(()));
        engine.expect_run_tests().returning(|_| Ok(vec![SuiteRunResult::new(1, 0)]));

        let mut toolchain = MockContractToolchain::new();
        toolchain
            .expect_reset_contract_files()
            .returning(|| Err(RunnerError::config("contracts registry")));

        let pipeline = ContractPipeline::new(Arc::new(engine), Arc::new(toolchain));
        let result = pipeline
            .run(&[PathBuf::from("test/a_test.sol")], &TestRunRequest::default())
            .await;

        assert_matches!(result, Err(RunnerError::ConfigurationError { .. }));
    }
}
