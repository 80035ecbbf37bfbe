//! Main entry point for the supervisor binary
//!
//! Wires the real services into a `NodeSupervisor`, launches the node and
//! then reads console commands from stdin until Ctrl+C.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;

use shared::{BusEvent, EventBus, IpcRole, NODE_ENDPOINT_TOPIC, ProcessId, logging, process_debug, process_info};
use supervisor::{
    Console, IpcChannel, NodeConfig, NodeSupervisor, ReadinessGate, SERVICE_NAME, SupervisorError, SupervisorResult,
    services::{CommandProcessFactory, ConnectionFlag, NetworkProber, TcpIpcChannel},
};

/// Supervises an external blockchain node
#[derive(Parser)]
#[command(name = "supervisor")]
#[command(about = "Starts, probes and stops an external blockchain node")]
pub struct Args {
    /// Tracing endpoint URL
    #[arg(long)]
    pub trace_ep: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Node configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the configured node endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Inter-process channel address
    #[arg(long, default_value = "127.0.0.1:6500")]
    pub ipc_addr: String,

    /// Inter-process role (server, client, none)
    #[arg(long, default_value = "server")]
    pub ipc_role: IpcRole,

    /// Peer number used in log output when running as IPC client
    #[arg(long, default_value = "1")]
    pub peer_id: u32,
}

#[tokio::main]
async fn main() -> SupervisorResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    match args.ipc_role {
        IpcRole::Client => ProcessId::init_peer(args.peer_id),
        IpcRole::Server | IpcRole::Neither => ProcessId::init_supervisor(),
    };

    let trace_endpoint = args
        .trace_ep
        .as_ref()
        .map(|url| logging::TracingEndpoint::new(url.clone()));
    logging::init_tracing_with_endpoint_and_level(trace_endpoint, Some(&args.log_level));
    logging::log_startup(ProcessId::current(), &format!("node supervisor ({} role)", args.ipc_role));

    let mut config = match &args.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };

    let ipc_addr: SocketAddr = args
        .ipc_addr
        .parse()
        .map_err(|e| SupervisorError::config(format!("Invalid IPC address: {e}")))?;
    let ipc = Arc::new(TcpIpcChannel::new(args.ipc_role, ipc_addr));
    if args.ipc_role != IpcRole::Neither {
        ipc.connect().await?;
    }

    // A client asks the server which node everybody shares
    if args.ipc_role == IpcRole::Client {
        if let Some(endpoint) = ipc.request(NODE_ENDPOINT_TOPIC, None).await? {
            process_debug!(ProcessId::current(), "🔗 Node endpoint from IPC server: {}", endpoint);
            config = config.with_endpoint(Some(endpoint));
        }
    }
    if let Some(endpoint) = args.endpoint {
        config = config.with_endpoint(Some(endpoint));
    }

    let bus = EventBus::new();
    let connection = ConnectionFlag::new();
    let prober = NetworkProber::new(config.probe_timeout());
    let gate = ReadinessGate::new(connection.clone(), prober);
    let console = Arc::new(Console::new(bus.clone()));

    let supervisor = Arc::new(
        NodeSupervisor::new(config, bus.clone(), gate, CommandProcessFactory, ipc.clone()).with_console(console.clone()),
    );
    supervisor.register().await?;
    let _peer_stops = supervisor.follow_peer_stops();

    track_connection(&bus, connection.clone());
    bus.start_service(SERVICE_NAME).await?;
    connection.mark_connected();

    let console_task = tokio::spawn(run_console(console));

    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
        Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
    }

    console_task.abort();
    bus.stop_service(SERVICE_NAME).await?;
    // Give the detached stop broadcast a moment to reach peers
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    ipc.shutdown().await;

    logging::log_success(ProcessId::current(), "Supervisor stopped gracefully");
    Ok(())
}

/// The node stays "connected" until it is seen exiting
fn track_connection(bus: &EventBus, connection: ConnectionFlag) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BusEvent::NodeExited { .. }) => connection.mark_disconnected(),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn run_console(console: Arc<Console>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match console.execute(&line).await {
            Ok(reply) => process_info!(ProcessId::current(), "{}", reply),
            Err(e) => logging::log_error(ProcessId::current(), "Console", &e),
        }
    }
}
