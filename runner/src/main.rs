//! Main entry point for the runner binary
//!
//! Wires the real services into a `TestRunner` and runs one request.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use runner::{
    ContractPipeline, Mode, RunnerResult, ScriptPipeline, TestRunRequest, TestRunner,
    config::DEFAULT_TEST_PATH,
    services::{
        BlockWatcher, CommandContractEngine, CommandSuiteRunner, IstanbulCoverage, JsonRpcClient, RealFileSystem,
        RpcClientProvider, SolcToolchain,
    },
};
use shared::{EventBus, ProcessId, logging, process_warn};

/// Runs a project's contract tests
#[derive(Parser)]
#[command(name = "runner")]
#[command(about = "Runs script suites or contract tests with gas reporting")]
pub struct Args {
    /// Test file or directory
    #[arg(default_value = DEFAULT_TEST_PATH)]
    pub path: PathBuf,

    /// Test mode (javascript, solidity, auto)
    #[arg(long, default_value = "auto")]
    pub mode: Mode,

    /// Shorthand for --mode solidity
    #[arg(long)]
    pub solc: bool,

    /// Generate a coverage report after the run
    #[arg(long)]
    pub coverage: bool,

    /// Do not open the coverage report
    #[arg(long)]
    pub no_browser: bool,

    /// Print the gas used by every deployment
    #[arg(long)]
    pub gas_details: bool,

    /// Print the decoded transactions of every test
    #[arg(long)]
    pub tx_details: bool,

    /// JSON-RPC endpoint of the node under test
    #[arg(long, default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Directory holding the project's contracts
    #[arg(long, default_value = "contracts")]
    pub contracts_dir: PathBuf,

    /// Solidity compiler binary
    #[arg(long, default_value = "solc")]
    pub solc_bin: String,

    /// Program running one script suite file
    #[arg(long, default_value = "node")]
    pub suite_cmd: String,

    /// Arguments placed before the suite file
    #[arg(long)]
    pub suite_arg: Vec<String>,

    /// Program running one contract test file
    #[arg(long, default_value = "remix-tests")]
    pub engine_cmd: String,

    /// Assertion library staged next to contract tests
    #[arg(long)]
    pub assert_library: Option<PathBuf>,

    /// Coverage report generator
    #[arg(long, default_value = "istanbul")]
    pub istanbul: String,

    /// Tracing endpoint URL
    #[arg(long)]
    pub trace_ep: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> RunnerResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    ProcessId::init_runner();
    let trace_endpoint = args
        .trace_ep
        .as_ref()
        .map(|url| logging::TracingEndpoint::new(url.clone()));
    logging::init_tracing_with_endpoint_and_level(trace_endpoint, Some(&args.log_level));
    logging::log_startup(ProcessId::current(), "test runner");

    let mut builder = TestRunRequest::builder()
        .root_path(args.path.clone())
        .mode(args.mode)
        .coverage(args.coverage)
        .no_browser(args.no_browser)
        .gas_details(args.gas_details)
        .tx_details(args.tx_details);
    if args.solc {
        builder = builder.solidity();
    }
    let request = builder.build();

    let bus = EventBus::new();
    let rpc = Arc::new(JsonRpcClient::new(args.rpc_url.clone()));
    let toolchain = Arc::new(
        SolcToolchain::new(rpc.clone(), bus.clone(), Arc::new(RealFileSystem::new()), args.contracts_dir.clone())
            .with_solc(args.solc_bin.clone()),
    );

    let script = ScriptPipeline::new(
        Arc::new(RpcClientProvider::new(rpc.clone())),
        toolchain.clone(),
        Arc::new(CommandSuiteRunner::new(args.suite_cmd.clone(), args.suite_arg.clone())),
        bus.clone(),
    );

    let mut engine = CommandContractEngine::new(args.engine_cmd.clone(), toolchain.clone());
    if let Some(library) = &args.assert_library {
        engine = engine.with_assert_library(library.clone());
    }
    let contract = ContractPipeline::new(Arc::new(engine), toolchain);

    let coverage = IstanbulCoverage::new(PathBuf::from(".")).with_istanbul(args.istanbul.clone());
    let runner = TestRunner::new(RealFileSystem::new(), coverage, script, contract);

    // Gas accounting needs a block feed; contract tests run in-VM without one
    let watcher = if request.mode.resolve() == Mode::Javascript {
        match BlockWatcher::new(rpc, bus.clone()).spawn().await {
            Ok(handle) => Some(handle),
            Err(e) => {
                process_warn!(ProcessId::current(), "⚠️ No block feed, gas will not be reported: {}", e);
                None
            }
        }
    } else {
        None
    };

    let outcome = runner.run(&request).await;
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    match outcome {
        Ok(total) => {
            logging::log_success(ProcessId::current(), &format!("{} tests passed", total.pass_count));
            Ok(())
        }
        Err(e) => {
            logging::log_error(ProcessId::current(), "Test run", &e);
            Err(e)
        }
    }
}
