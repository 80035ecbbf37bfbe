//! Terminal spec reporter with gas accounting
//!
//! Consumes suite lifecycle events plus two bus side channels: block
//! headers (gas per block) and deployment receipts. Gas of every block is
//! added to the running total and to the current test. With transaction
//! details enabled each block is fetched and its calls to known contracts
//! are decoded into the log of the running test.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use shared::{BlockHeader, BusEvent, ContractReceipt, EventBus, ProcessId, process_debug, process_error, process_warn};

use super::decode::decode_call;
use super::{ApiReporter, ContractRegistry, RunnerEvent, SLOW_TEST_MS, Speed, Tone, paint};
use crate::config::TestRunRequest;
use crate::core::DeployedContract;
use crate::error::RunnerResult;
use crate::traits::{ChainClient, ContractToolchain};

/// Command topic flipping whether block gas is accounted
pub const TOGGLE_GAS_LISTENER_TOPIC: &str = "reporter:toggleGasListener";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterOptions {
    pub gas_details: bool,
    pub tx_details: bool,
    pub gas_limit: u64,
    pub colors: bool,
}

impl ReporterOptions {
    pub fn from_request(request: &TestRunRequest) -> Self {
        Self {
            gas_details: request.gas_details,
            tx_details: request.tx_details,
            gas_limit: request.gas_limit,
            colors: true,
        }
    }

    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub passes: usize,
    pub failures: usize,
    pub pending: usize,
    /// Gas of every accounted block in this run
    pub total_gas: u64,
    /// Gas accounted to the current test
    pub test_gas: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
struct Failure {
    title: String,
    error: String,
}

pub struct SpecReporter<W: Write> {
    out: W,
    options: ReporterOptions,
    bus: EventBus,
    side: Option<broadcast::Receiver<BusEvent>>,
    chain: Option<Arc<dyn ChainClient>>,
    contracts: Option<Arc<dyn ContractToolchain>>,
    api: Option<ApiReporter>,
    listen_for_gas: bool,
    indents: usize,
    stats: ReporterStats,
    registry: ContractRegistry,
    tx_logs: Vec<String>,
    failures: Vec<Failure>,
    started: Option<Instant>,
}

impl<W: Write + Send> SpecReporter<W> {
    /// The side channels are subscribed here, so receipts published before
    /// `run` is first polled are not lost
    pub fn new(out: W, options: ReporterOptions, bus: EventBus) -> Self {
        Self {
            out,
            options,
            side: Some(bus.subscribe()),
            bus,
            chain: None,
            contracts: None,
            api: None,
            listen_for_gas: true,
            indents: 0,
            stats: ReporterStats::default(),
            registry: ContractRegistry::new(),
            tx_logs: Vec::new(),
            failures: Vec::new(),
            started: None,
        }
    }

    /// Client used to fetch blocks for transaction details
    pub fn with_chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Source of ABIs for deployed contracts
    pub fn with_contracts(mut self, contracts: Arc<dyn ContractToolchain>) -> Self {
        self.contracts = Some(contracts);
        self
    }

    /// Forward every lifecycle event to an API reporter as well
    pub fn with_api_reporter(mut self, api: ApiReporter) -> Self {
        self.api = Some(api);
        self
    }

    pub fn stats(&self) -> &ReporterStats {
        &self.stats
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn listens_for_gas(&self) -> bool {
        self.listen_for_gas
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Consume events until `End` (or until the runner hangs up)
    ///
    /// Every subscription is released before the summary is printed.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<RunnerEvent>) -> RunnerResult<ReporterStats> {
        let mut side = self.side.take().unwrap_or_else(|| self.bus.subscribe());
        let mut side_open = true;
        self.register_toggle().await;

        loop {
            // Side channel first: gas published before a test result belongs to that test
            tokio::select! {
                biased;
                side_event = side.recv(), if side_open => match side_event {
                    Ok(event) => self.on_side_event(event).await?,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        process_warn!(ProcessId::current(), "⚠️ Reporter missed {} bus events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => side_open = false,
                },
                event = events.recv() => match event {
                    Some(RunnerEvent::End) | None => break,
                    Some(event) => self.on_runner_event(event)?,
                },
            }
        }

        drop(side);
        events.close();
        drop(events);
        self.bus.remove_command_handler(TOGGLE_GAS_LISTENER_TOPIC).await;

        if let Some(started) = self.started {
            self.stats.duration = started.elapsed();
        }
        if let Some(api) = self.api.as_mut() {
            api.on_event(&RunnerEvent::End);
        }
        self.epilogue()?;
        Ok(self.stats.clone())
    }

    async fn register_toggle(&self) {
        let bus = self.bus.clone();
        self.bus
            .set_command_handler(TOGGLE_GAS_LISTENER_TOPIC, move || {
                let bus = bus.clone();
                async move {
                    bus.publish(BusEvent::ToggleGasListener);
                    Ok("Gas listener toggled".to_string())
                }
            })
            .await;
    }

    fn indent(&self) -> String {
        "  ".repeat(self.indents.saturating_sub(1))
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        paint(text, tone, self.options.colors)
    }

    fn gas_tone(&self, gas: u64) -> Tone {
        Speed::for_gas(gas, self.options.gas_limit).tone()
    }

    fn on_runner_event(&mut self, event: RunnerEvent) -> RunnerResult<()> {
        if let Some(api) = self.api.as_mut() {
            api.on_event(&event);
        }

        match event {
            RunnerEvent::Start => {
                self.started = Some(Instant::now());
                writeln!(self.out)?;
            }
            RunnerEvent::Suite { title } => {
                self.indents += 1;
                if self.options.gas_details {
                    writeln!(self.out)?;
                }
                let line = format!("{}{}", self.indent(), self.paint(&title, Tone::Suite));
                writeln!(self.out, "{line}")?;
            }
            RunnerEvent::SuiteEnd { .. } => {
                self.indents = self.indents.saturating_sub(1);
                if self.indents == 1 {
                    writeln!(self.out)?;
                }
            }
            RunnerEvent::Pending { title } => {
                self.stats.pending += 1;
                let line = format!("{}{}", self.indent(), self.paint(&format!("  - {title}"), Tone::Pending));
                writeln!(self.out, "{line}")?;
            }
            RunnerEvent::Test { .. } => {
                self.stats.test_gas = 0;
            }
            RunnerEvent::Pass { title, duration_ms, .. } => {
                self.stats.passes += 1;
                let speed = Speed::for_duration(duration_ms, SLOW_TEST_MS);
                let gas = self.stats.test_gas;
                let line = format!(
                    "{}{}{}{} - {}",
                    self.indent(),
                    self.paint("  ✓", Tone::Checkmark),
                    self.paint(&format!(" {title}"), Tone::Pass),
                    self.paint(&format!(" ({duration_ms}ms)"), speed.tone()),
                    self.paint(&format!("[{gas} gas]"), self.gas_tone(gas)),
                );
                writeln!(self.out, "{line}")?;
                self.flush_tx_logs()?;
            }
            RunnerEvent::Fail { title, error, .. } => {
                self.stats.failures += 1;
                let gas = self.stats.test_gas;
                let line = format!(
                    "{}{} - {}",
                    self.indent(),
                    self.paint(&format!("  {}) {title}", self.stats.failures), Tone::Fail),
                    self.paint(&format!("[{gas} gas]"), self.gas_tone(gas)),
                );
                writeln!(self.out, "{line}")?;
                self.failures.push(Failure { title, error });
                self.flush_tx_logs()?;
            }
            RunnerEvent::End => {}
        }
        Ok(())
    }

    fn flush_tx_logs(&mut self) -> RunnerResult<()> {
        for log in std::mem::take(&mut self.tx_logs) {
            writeln!(self.out, "{log}")?;
        }
        Ok(())
    }

    async fn on_side_event(&mut self, event: BusEvent) -> RunnerResult<()> {
        match event {
            BusEvent::ContractReceipt(receipt) => self.on_contract_receipt(receipt).await,
            BusEvent::BlockHeader(header) => {
                self.on_block_header(header).await;
                Ok(())
            }
            BusEvent::ToggleGasListener => {
                self.listen_for_gas = !self.listen_for_gas;
                process_debug!(ProcessId::current(), "⛽ Gas listener {}", if self.listen_for_gas { "on" } else { "off" });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn on_contract_receipt(&mut self, receipt: ContractReceipt) -> RunnerResult<()> {
        let record = self.lookup_contract(&receipt).await;
        self.registry.upsert(record);

        if self.options.gas_details {
            let line = format!(
                "{}{}{}{}",
                self.paint(" ", Tone::Success),
                self.paint(&format!(" {}", receipt.class_name), Tone::Suite),
                self.paint(" deployed for ", Tone::Light),
                self.paint(&format!("{} gas", receipt.gas_used), self.gas_tone(receipt.gas_used)),
            );
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    /// Full deployment record for a receipt, ABI included when known
    async fn lookup_contract(&self, receipt: &ContractReceipt) -> DeployedContract {
        let bare = || DeployedContract::bare(receipt.class_name.clone(), receipt.address.clone());
        let Some(contracts) = &self.contracts else {
            return bare();
        };

        match contracts.list_contracts().await {
            Ok(list) => list
                .into_iter()
                .find(|c| c.class_name == receipt.class_name)
                .map(|mut c| {
                    c.deployed_address = receipt.address.clone();
                    c
                })
                .unwrap_or_else(bare),
            Err(e) => {
                process_warn!(ProcessId::current(), "⚠️ No ABI for {}: {}", receipt.class_name, e);
                bare()
            }
        }
    }

    async fn on_block_header(&mut self, header: BlockHeader) {
        if !self.listen_for_gas {
            return;
        }
        self.stats.total_gas += header.gas_used;
        self.stats.test_gas += header.gas_used;

        if !self.options.tx_details {
            return;
        }
        let Some(chain) = &self.chain else {
            return;
        };

        let block = match chain.block_by_number(header.number).await {
            Ok(Some(block)) => block,
            Ok(None) => return,
            Err(e) => {
                process_error!(ProcessId::current(), "❌ Error getting block header: {}", e);
                return;
            }
        };

        for tx in &block.transactions {
            let Some(to) = tx.to.as_deref() else { continue };
            let Some(contract) = self.registry.match_transaction(to) else {
                continue;
            };
            let (function, params) = match decode_call(contract, &tx.input) {
                Some(call) => (call.function_name, call.params),
                None => (tx.input.chars().take(10).collect(), String::new()),
            };
            self.tx_logs
                .push(format!("\t\t- {}.{}({}) [{} gas]", contract.class_name, function, params, tx.gas));
        }
    }

    fn epilogue(&mut self) -> RunnerResult<()> {
        let stats = self.stats.clone();
        writeln!(self.out)?;

        let line = format!(
            "{}{}{}",
            self.paint(&format!("  {} passing", stats.passes), Tone::Success),
            self.paint(&format!(" ({})", format_duration(stats.duration)), Tone::Light),
            self.paint(&format!(" - [Total: {} gas]", stats.total_gas), Tone::Light),
        );
        writeln!(self.out, "{line}")?;

        if stats.pending > 0 {
            let line = self.paint(&format!("  {} pending", stats.pending), Tone::Pending);
            writeln!(self.out, "{line}")?;
        }

        if stats.failures > 0 {
            let line = self.paint(&format!("  {} failing", stats.failures), Tone::Fail);
            writeln!(self.out, "{line}")?;
            writeln!(self.out)?;
            for (index, failure) in std::mem::take(&mut self.failures).into_iter().enumerate() {
                writeln!(self.out, "  {}) {}:", index + 1, failure.title)?;
                let error = self.paint(&failure.error, Tone::Fail);
                writeln!(self.out, "     {error}")?;
                writeln!(self.out)?;
            }
        }

        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Short human duration: `850ms`, `12s`, `3m`
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{}m", ms / 60_000)
    }
}
