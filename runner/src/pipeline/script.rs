//! Script test mode
//!
//! Connects to the node, compiles the project's contracts and hands the
//! suite runner an explicit `SuiteContext`. Deployment happens in the
//! context's before hook, so it runs once, right before the first test.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::mpsc;

use shared::{EventBus, ProcessId, process_debug, process_info, process_warn};

use crate::config::{TEST_TIMEOUT, TestRunRequest};
use crate::core::{BeforeHook, CompiledContract, SuiteContext, SuiteRunResult};
use crate::error::{RunnerError, RunnerResult};
use crate::reporter::{ApiReporter, Output, ReporterOptions, SpecReporter};
use crate::traits::{ClientProvider, ContractToolchain, ModePipeline, SuiteRunner};

pub struct ScriptPipeline<P, T, R>
where
    P: ClientProvider + 'static,
    T: ContractToolchain + 'static,
    R: SuiteRunner + 'static,
{
    provider: Arc<P>,
    toolchain: Arc<T>,
    suites: Arc<R>,
    bus: EventBus,
    output: Output,
    colors: bool,
    timeout: Duration,
}

impl<P, T, R> ScriptPipeline<P, T, R>
where
    P: ClientProvider + 'static,
    T: ContractToolchain + 'static,
    R: SuiteRunner + 'static,
{
    pub fn new(provider: Arc<P>, toolchain: Arc<T>, suites: Arc<R>, bus: EventBus) -> Self {
        Self {
            provider,
            toolchain,
            suites,
            bus,
            output: Output::Stdout,
            colors: true,
            timeout: TEST_TIMEOUT,
        }
    }

    /// Send reporter output somewhere other than stdout
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Per-test timeout handed to the suite runner
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deploy everything that was compiled, then list the deployments
    fn before_hook(&self, compiled: Vec<CompiledContract>, gas_limit: u64) -> BeforeHook {
        let toolchain = self.toolchain.clone();
        Arc::new(move || {
            let toolchain = toolchain.clone();
            let compiled = compiled.clone();
            async move {
                toolchain.deploy(&compiled, gas_limit).await?;
                let deployed = toolchain.list_contracts().await?;
                process_debug!(ProcessId::current(), "📦 Deployed {} contracts", deployed.len());
                Ok(deployed)
            }
            .boxed()
        })
    }
}

#[async_trait]
impl<P, T, R> ModePipeline for ScriptPipeline<P, T, R>
where
    P: ClientProvider + 'static,
    T: ContractToolchain + 'static,
    R: SuiteRunner + 'static,
{
    async fn run(&self, files: &[PathBuf], request: &TestRunRequest) -> RunnerResult<Vec<SuiteRunResult>> {
        let client = self.provider.client().await?;
        let accounts = client
            .accounts()
            .await
            .map_err(|e| RunnerError::AccountsError { message: e.to_string() })?;

        let contract_files = self.toolchain.contract_files().await?;
        let compiled = self.toolchain.compile(&contract_files).await?;
        process_info!(
            ProcessId::current(),
            "🧪 Running {} test files with {} compiled contracts",
            files.len(),
            compiled.len()
        );

        let hook = self.before_hook(compiled.clone(), request.gas_limit);
        let context = SuiteContext::new(accounts, compiled, self.timeout).with_before(hook);

        let contracts: Arc<dyn ContractToolchain> = self.toolchain.clone();
        let options = ReporterOptions::from_request(request).with_colors(self.colors);
        let mut reporter = SpecReporter::new(self.output.clone(), options, self.bus.clone())
            .with_chain(client)
            .with_contracts(contracts)
            .with_api_reporter(ApiReporter::new(self.bus.clone()));

        let (events, event_rx) = mpsc::unbounded_channel();
        let reporting = tokio::spawn(async move { reporter.run(event_rx).await });

        // The sender is dropped when the run returns, which ends the reporter
        let outcome = self.suites.run(files, context, events).await;

        match reporting.await {
            Ok(Ok(stats)) => process_debug!(
                ProcessId::current(),
                "📊 Reporter finished: {} passing, {} failing, {} gas",
                stats.passes,
                stats.failures,
                stats.total_gas
            ),
            Ok(Err(e)) => process_warn!(ProcessId::current(), "⚠️ Reporter failed: {}", e),
            Err(e) => process_warn!(ProcessId::current(), "⚠️ Reporter task aborted: {}", e),
        }

        Ok(vec![outcome?])
    }
}
