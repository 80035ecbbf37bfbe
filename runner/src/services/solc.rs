//! `solc` backed contract toolchain
//!
//! Compiles the project's contracts with the solc command line compiler and
//! deploys them over JSON-RPC from the node's first account. Every
//! deployment is announced on the bus as a `ContractReceipt`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use shared::{BusEvent, ContractReceipt, EventBus, ProcessId, process_debug, process_info};

use crate::core::{AbiEntry, CompiledContract, DeployedContract};
use crate::error::{RunnerError, RunnerResult};
use crate::services::rpc::JsonRpcClient;
use crate::traits::{ChainClient, ContractToolchain, FileSystem};

const SOLIDITY_SUFFIX: &str = ".sol";
const TEST_SUFFIX: &str = "_test.sol";

#[derive(Debug, Deserialize)]
struct CombinedOutput {
    #[serde(default)]
    contracts: BTreeMap<String, CombinedContract>,
}

#[derive(Debug, Deserialize)]
struct CombinedContract {
    /// A JSON string in older compilers, an array in newer ones
    abi: Value,
    #[serde(default)]
    bin: String,
    #[serde(default)]
    hashes: BTreeMap<String, String>,
}

/// Turn `solc --combined-json abi,bin,hashes` output into contract records
///
/// Keys look like `path/File.sol:ClassName`; the class name is the part
/// after the last colon.
pub fn parse_combined_json(text: &str) -> RunnerResult<Vec<CompiledContract>> {
    let output: CombinedOutput = serde_json::from_str(text)?;

    output
        .contracts
        .into_iter()
        .map(|(key, contract)| -> RunnerResult<CompiledContract> {
            let class_name = key.rsplit(':').next().unwrap_or(&key).to_string();
            let abi: Vec<AbiEntry> = match contract.abi {
                Value::String(encoded) => serde_json::from_str(&encoded)?,
                other => serde_json::from_value(other)?,
            };
            Ok(CompiledContract {
                class_name,
                abi,
                bytecode: contract.bin,
                function_hashes: contract.hashes,
            })
        })
        .collect()
}

pub struct SolcToolchain<F: FileSystem + 'static> {
    rpc: Arc<JsonRpcClient>,
    bus: EventBus,
    file_system: Arc<F>,
    contracts_dir: PathBuf,
    solc: String,
    /// Files registered on top of the contracts directory
    extra_files: Mutex<Vec<PathBuf>>,
    deployed: Mutex<Vec<DeployedContract>>,
}

impl<F: FileSystem + 'static> SolcToolchain<F> {
    pub fn new(rpc: Arc<JsonRpcClient>, bus: EventBus, file_system: Arc<F>, contracts_dir: PathBuf) -> Self {
        Self {
            rpc,
            bus,
            file_system,
            contracts_dir,
            solc: "solc".to_string(),
            extra_files: Mutex::new(Vec::new()),
            deployed: Mutex::new(Vec::new()),
        }
    }

    /// Use a specific compiler binary
    pub fn with_solc(mut self, solc: impl Into<String>) -> Self {
        self.solc = solc.into();
        self
    }

    async fn run_solc(&self, files: &[PathBuf]) -> RunnerResult<String> {
        let output = Command::new(&self.solc)
            .arg("--combined-json")
            .arg("abi,bin,hashes")
            .args(files)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunnerError::compile(format!("failed to run {}: {e}", self.solc)))?;

        if !output.status.success() {
            return Err(RunnerError::compile(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn deploy_one(&self, from: &str, contract: &CompiledContract, gas_limit: u64) -> RunnerResult<DeployedContract> {
        let data = format!("0x{}", contract.bytecode.trim_start_matches("0x"));
        let hash = self.rpc.send_transaction(from, None, &data, gas_limit).await.map_err(|e| {
            RunnerError::deploy(format!("{}: {e}", contract.class_name))
        })?;
        let receipt = self.rpc.wait_for_receipt(&hash).await?;

        let address = match (&receipt.contract_address, receipt.succeeded()) {
            (Some(address), true) => address.clone(),
            _ => return Err(RunnerError::deploy(format!("{} reverted in {hash}", contract.class_name))),
        };

        self.bus.publish(BusEvent::ContractReceipt(ContractReceipt {
            class_name: contract.class_name.clone(),
            address: address.clone(),
            gas_used: receipt.gas_used,
        }));
        Ok(DeployedContract::from_compiled(contract, address))
    }
}

fn is_contract_source(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(SOLIDITY_SUFFIX) && !name.ends_with(TEST_SUFFIX)
}

#[async_trait]
impl<F: FileSystem + 'static> ContractToolchain for SolcToolchain<F> {
    async fn contract_files(&self) -> RunnerResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = match self.file_system.list_files(&self.contracts_dir).await {
            Ok(found) => found.into_iter().filter(|p| is_contract_source(p)).collect(),
            Err(RunnerError::InputError { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        for extra in self.extra_files.lock().await.iter() {
            if !files.contains(extra) {
                files.push(extra.clone());
            }
        }
        Ok(files)
    }

    async fn compile(&self, files: &[PathBuf]) -> RunnerResult<Vec<CompiledContract>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = parse_combined_json(&self.run_solc(files).await?)?;
        process_info!(ProcessId::current(), "🔨 Compiled {} contracts", compiled.len());
        Ok(compiled)
    }

    async fn deploy(&self, contracts: &[CompiledContract], gas_limit: u64) -> RunnerResult<()> {
        let deployable: Vec<&CompiledContract> = contracts.iter().filter(|c| !c.bytecode.is_empty()).collect();
        if deployable.is_empty() {
            return Ok(());
        }

        let accounts = self
            .rpc
            .accounts()
            .await
            .map_err(|e| RunnerError::AccountsError { message: e.to_string() })?;
        let from = accounts
            .first()
            .ok_or_else(|| RunnerError::AccountsError {
                message: "node has no accounts".to_string(),
            })?
            .clone();

        for contract in deployable {
            let record = self.deploy_one(&from, contract, gas_limit).await?;
            process_debug!(
                ProcessId::current(),
                "📦 {} deployed at {}",
                record.class_name,
                record.deployed_address
            );

            let mut deployed = self.deployed.lock().await;
            deployed.retain(|d| d.class_name != record.class_name);
            deployed.push(record);
        }
        Ok(())
    }

    async fn list_contracts(&self) -> RunnerResult<Vec<DeployedContract>> {
        Ok(self.deployed.lock().await.clone())
    }

    async fn register_contract_files(&self, files: &[PathBuf]) -> RunnerResult<()> {
        let mut extra = self.extra_files.lock().await;
        for file in files {
            if !extra.contains(file) {
                extra.push(file.clone());
            }
        }
        Ok(())
    }

    async fn reset_contract_files(&self) -> RunnerResult<()> {
        self.extra_files.lock().await.clear();
        Ok(())
    }
}
