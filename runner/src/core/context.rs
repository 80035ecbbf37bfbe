//! Explicit context handed to script suites
//!
//! Test scripts reach compiled contracts through `require` with the
//! `Embark/contracts/` prefix. Each contract is represented by a
//! `ContractHandle` created before any test runs; the before hook deploys
//! the contracts and binds every handle exactly once, so a script holding
//! a handle early observes the live deployment later.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::core::contract::{CompiledContract, DeployedContract};
use crate::error::{RunnerError, RunnerResult};

/// Module path prefix under which test scripts find compiled contracts
pub const CONTRACT_PREFIX: &str = "Embark/contracts/";

/// Deploys the compiled contracts and lists what ended up on chain
pub type BeforeHook = Arc<dyn Fn() -> BoxFuture<'static, RunnerResult<Vec<DeployedContract>>> + Send + Sync>;

/// Placeholder for a contract that is bound to its deployment once
#[derive(Debug, Clone)]
pub struct ContractHandle {
    class_name: String,
    bound: Arc<OnceLock<DeployedContract>>,
}

impl ContractHandle {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            bound: Arc::new(OnceLock::new()),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn bind(&self, deployed: DeployedContract) -> RunnerResult<()> {
        self.bound.set(deployed).map_err(|_| RunnerError::AlreadyBound {
            class_name: self.class_name.clone(),
        })
    }

    pub fn get(&self) -> Option<&DeployedContract> {
        self.bound.get()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Both handles are the same placeholder
    pub fn same_as(&self, other: &ContractHandle) -> bool {
        Arc::ptr_eq(&self.bound, &other.bound)
    }
}

#[derive(Clone)]
pub struct SuiteContext {
    accounts: Vec<String>,
    compiled: BTreeMap<String, CompiledContract>,
    handles: BTreeMap<String, ContractHandle>,
    timeout: Duration,
    before: Option<BeforeHook>,
    before_done: Arc<OnceCell<()>>,
}

impl SuiteContext {
    pub fn new(accounts: Vec<String>, compiled: Vec<CompiledContract>, timeout: Duration) -> Self {
        let handles = compiled
            .iter()
            .map(|c| (c.class_name.clone(), ContractHandle::new(c.class_name.clone())))
            .collect();
        let compiled = compiled.into_iter().map(|c| (c.class_name.clone(), c)).collect();

        Self {
            accounts,
            compiled,
            handles,
            timeout,
            before: None,
            before_done: Arc::new(OnceCell::new()),
        }
    }

    /// Install the hook run by `run_before`
    pub fn with_before(mut self, hook: BeforeHook) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn compiled(&self, class_name: &str) -> Option<&CompiledContract> {
        self.compiled.get(class_name)
    }

    pub fn handle(&self, class_name: &str) -> Option<&ContractHandle> {
        self.handles.get(class_name)
    }

    pub fn handles(&self) -> impl Iterator<Item = &ContractHandle> {
        self.handles.values()
    }

    /// Resolve a module path; only `Embark/contracts/<Class>` is served here
    pub fn require(&self, module: &str) -> Option<&ContractHandle> {
        module.strip_prefix(CONTRACT_PREFIX).and_then(|name| self.handle(name))
    }

    /// Bind handles to their deployments; returns how many were bound
    pub fn bind_all(&self, deployed: Vec<DeployedContract>) -> RunnerResult<usize> {
        let mut bound = 0;
        for contract in deployed {
            if let Some(handle) = self.handles.get(&contract.class_name) {
                handle.bind(contract)?;
                bound += 1;
            }
        }
        Ok(bound)
    }

    /// Run the before hook once; later calls reuse the first outcome
    pub async fn run_before(&self) -> RunnerResult<()> {
        let Some(hook) = self.before.clone() else {
            return Ok(());
        };
        self.before_done
            .get_or_try_init(|| async move {
                let deployed = hook().await?;
                self.bind_all(deployed).map(|_| ())
            })
            .await
            .map(|_| ())
    }

    /// JSON view of the context for out-of-process suite runners
    pub fn snapshot(&self) -> Value {
        let contracts: serde_json::Map<String, Value> = self
            .handles
            .iter()
            .map(|(name, handle)| {
                let entry = match handle.get() {
                    Some(deployed) => json!({
                        "address": deployed.deployed_address,
                        "abi": deployed.abi,
                    }),
                    None => json!({ "address": Value::Null, "abi": self.compiled.get(name).map(|c| &c.abi) }),
                };
                (name.clone(), entry)
            })
            .collect();

        json!({
            "accounts": self.accounts,
            "timeoutMs": self.timeout.as_millis() as u64,
            "contractPrefix": CONTRACT_PREFIX,
            "contracts": contracts,
        })
    }
}

impl fmt::Debug for SuiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteContext")
            .field("accounts", &self.accounts)
            .field("contracts", &self.handles.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("has_before", &self.before.is_some())
            .finish()
    }
}
