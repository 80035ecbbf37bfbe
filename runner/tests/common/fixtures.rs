//! Test fixtures: fake collaborators with observable call counts

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{Mutex, mpsc};

use runner::core::{AbiEntry, AbiParam, CompiledContract, DeployedContract};
use runner::traits::{
    ChainClient, ClientProvider, ContractTestEngine, ContractToolchain, CoverageReporter, MockChainClient, SuiteRunner,
};
use runner::{RunnerError, RunnerEvent, RunnerResult, SuiteContext, SuiteRunResult};
use shared::{BusEvent, ContractReceipt, EventBus};

pub struct TestFixtures;

impl TestFixtures {
    pub const ACCOUNT: &'static str = "0x00000000000000000000000000000000000000a1";
    pub const TOKEN_ADDRESS: &'static str = "0x00000000000000000000000000000000000000aa";

    /// Project directory with `files` created under it
    pub fn project(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    /// Leave the artifacts a contract test run creates
    pub fn leave_artifacts(root: &Path) {
        std::fs::create_dir_all(root.join(".embark/contracts")).unwrap();
        std::fs::write(root.join(".embark/contracts/token_test.sol"), "").unwrap();
        std::fs::write(root.join(".embark/remix_tests.sol"), "").unwrap();
    }

    pub fn artifacts_removed(root: &Path) -> bool {
        !root.join(".embark/contracts").exists() && !root.join(".embark/remix_tests.sol").exists()
    }

    pub fn token() -> CompiledContract {
        let mut function_hashes = BTreeMap::new();
        function_hashes.insert("mint(uint256)".to_string(), "a0712d68".to_string());
        CompiledContract {
            class_name: "Token".to_string(),
            abi: vec![AbiEntry {
                kind: "function".to_string(),
                name: "mint".to_string(),
                inputs: vec![AbiParam {
                    name: "amount".to_string(),
                    kind: "uint256".to_string(),
                }],
            }],
            bytecode: "6080604052".to_string(),
            function_hashes,
        }
    }

    pub fn pass(title: &str) -> Vec<RunnerEvent> {
        vec![
            RunnerEvent::Test { title: title.to_string() },
            RunnerEvent::Pass {
                title: title.to_string(),
                duration_ms: 2,
                file: None,
            },
        ]
    }

    pub fn fail(title: &str) -> Vec<RunnerEvent> {
        vec![
            RunnerEvent::Test { title: title.to_string() },
            RunnerEvent::Fail {
                title: title.to_string(),
                error: "AssertionError: expected true".to_string(),
                duration_ms: None,
                file: None,
            },
        ]
    }
}

/// Hands out a mocked client with one account
pub struct FakeProvider {
    pub fail_accounts: bool,
}

#[async_trait]
impl ClientProvider for FakeProvider {
    async fn client(&self) -> RunnerResult<Arc<dyn ChainClient>> {
        let fail = self.fail_accounts;
        let mut client = MockChainClient::new();
        client.expect_accounts().returning(move || {
            if fail {
                Err(RunnerError::chain("connection refused"))
            } else {
                Ok(vec![TestFixtures::ACCOUNT.to_string()])
            }
        });
        client.expect_block_by_number().returning(|_| Ok(None));
        Ok(Arc::new(client))
    }
}

/// Toolchain that "deploys" by publishing receipts
pub struct FakeToolchain {
    bus: EventBus,
    fail_deploy: bool,
    deployed: Mutex<Vec<DeployedContract>>,
    registered: Mutex<Vec<PathBuf>>,
    pub deploys: AtomicUsize,
    pub resets: AtomicUsize,
}

impl FakeToolchain {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            fail_deploy: false,
            deployed: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
            deploys: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn failing_deploy(mut self) -> Self {
        self.fail_deploy = true;
        self
    }

    pub fn deploys(&self) -> usize {
        self.deploys.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractToolchain for FakeToolchain {
    async fn contract_files(&self) -> RunnerResult<Vec<PathBuf>> {
        Ok(vec![PathBuf::from("contracts/token.sol")])
    }

    async fn compile(&self, _files: &[PathBuf]) -> RunnerResult<Vec<CompiledContract>> {
        Ok(vec![TestFixtures::token()])
    }

    async fn deploy(&self, contracts: &[CompiledContract], _gas_limit: u64) -> RunnerResult<()> {
        self.deploys.fetch_add(1, Ordering::SeqCst);
        if self.fail_deploy {
            return Err(RunnerError::deploy("Token: out of gas"));
        }
        let mut deployed = self.deployed.lock().await;
        for contract in contracts {
            self.bus.publish(BusEvent::ContractReceipt(ContractReceipt {
                class_name: contract.class_name.clone(),
                address: TestFixtures::TOKEN_ADDRESS.to_string(),
                gas_used: 450_000,
            }));
            deployed.push(DeployedContract::from_compiled(contract, TestFixtures::TOKEN_ADDRESS));
        }
        Ok(())
    }

    async fn list_contracts(&self) -> RunnerResult<Vec<DeployedContract>> {
        Ok(self.deployed.lock().await.clone())
    }

    async fn register_contract_files(&self, files: &[PathBuf]) -> RunnerResult<()> {
        self.registered.lock().await.extend(files.iter().cloned());
        Ok(())
    }

    async fn reset_contract_files(&self) -> RunnerResult<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.registered.lock().await.clear();
        Ok(())
    }
}

/// Suite runner replaying scripted lifecycle events
#[derive(Clone)]
pub struct ScriptedSuites {
    events: Vec<RunnerEvent>,
    pub runs: Arc<AtomicUsize>,
    /// Every contract handle was bound when the first test ran
    pub saw_bound_handles: Arc<AtomicBool>,
}

impl ScriptedSuites {
    pub fn new(events: Vec<RunnerEvent>) -> Self {
        Self {
            events,
            runs: Arc::new(AtomicUsize::new(0)),
            saw_bound_handles: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl SuiteRunner for ScriptedSuites {
    async fn run(
        &self,
        files: &[PathBuf],
        context: SuiteContext,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunnerResult<SuiteRunResult> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let _ = events.send(RunnerEvent::Start);
        context.run_before().await?;
        self.saw_bound_handles
            .store(context.handles().all(|h| h.is_bound()), Ordering::SeqCst);

        let _ = events.send(RunnerEvent::Suite { title: String::new() });
        for file in files {
            let title = file.file_name().unwrap().to_string_lossy().to_string();
            let _ = events.send(RunnerEvent::Suite { title: title.clone() });
            for event in &self.events {
                let _ = events.send(event.clone());
            }
            let _ = events.send(RunnerEvent::SuiteEnd { title });
        }
        let _ = events.send(RunnerEvent::SuiteEnd { title: String::new() });
        let _ = events.send(RunnerEvent::End);

        let mut result = SuiteRunResult::default();
        for event in &self.events {
            match event {
                RunnerEvent::Pass { .. } => result.pass_count += files.len(),
                RunnerEvent::Fail { .. } => result.failure_count += files.len(),
                _ => {}
            }
        }
        Ok(result)
    }
}

/// Contract test engine with a fixed result per file name
pub struct FakeEngine {
    results: BTreeMap<String, SuiteRunResult>,
    fail_setup: bool,
    pub runs: Mutex<Vec<PathBuf>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            results: BTreeMap::new(),
            fail_setup: false,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, file_name: &str, result: SuiteRunResult) -> Self {
        self.results.insert(file_name.to_string(), result);
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }
}

#[async_trait]
impl ContractTestEngine for FakeEngine {
    async fn init(&self) -> RunnerResult<()> {
        Ok(())
    }

    async fn setup_tests(&self, _files: &[PathBuf]) -> RunnerResult<()> {
        if self.fail_setup {
            return Err(RunnerError::compile("token_test.sol:3: ParserError"));
        }
        Ok(())
    }

    async fn run_tests(&self, file: &Path) -> RunnerResult<Vec<SuiteRunResult>> {
        self.runs.lock().await.push(file.to_path_buf());
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        Ok(self.results.get(&name).copied().into_iter().collect())
    }
}

/// Coverage reporter counting generate and open calls
#[derive(Clone, Default)]
pub struct FakeCoverage {
    pub generated: Arc<AtomicUsize>,
    pub opened: Arc<AtomicUsize>,
}

#[async_trait]
impl CoverageReporter for FakeCoverage {
    async fn generate(&self) -> RunnerResult<PathBuf> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from("coverage/index.html"))
    }

    async fn open(&self, _report: &Path) -> RunnerResult<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
