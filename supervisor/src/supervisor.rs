//! Node supervisor
//!
//! Owns the managed node process. `launch` gates every start behind the
//! readiness check and settles exactly once however the node's ready and
//! exit announcements interleave. `stop` tells peer processes to stop their
//! nodes (server role) without waiting for them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use shared::{
    BusEvent, EventBus, IpcRole, Launchable, NODE_ENDPOINT_TOPIC, ProcessId, STOP_NODE_TOPIC,
    SharedError, SharedResult, process_debug, process_error, process_info, process_warn,
};

use crate::config::NodeConfig;
use crate::console::{Console, ConsoleAction};
use crate::error::{SupervisorError, SupervisorResult};
use crate::readiness::ReadinessGate;
use crate::traits::{ClientState, IpcChannel, ManagedProcess, ProcessFactory, Prober, RequestHandler};

/// Name the supervisor is registered under on the bus
pub const SERVICE_NAME: &str = "blockchain";

pub const LOGS_ENABLE_TOPIC: &str = "logs:ethereum:enable";
pub const LOGS_DISABLE_TOPIC: &str = "logs:ethereum:disable";

/// How a successful launch came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A node was already serving; nothing was spawned
    AlreadyRunning,
    /// A node was spawned and confirmed reachable
    Started,
}

enum Lifecycle {
    Ready,
    Exited(Option<i32>),
}

pub struct NodeSupervisor<S, P, F, I>
where
    S: ClientState + 'static,
    P: Prober + 'static,
    F: ProcessFactory + 'static,
    I: IpcChannel + 'static,
{
    config: NodeConfig,
    bus: EventBus,
    gate: ReadinessGate<S, P>,
    factory: F,
    ipc: Arc<I>,
    process: Mutex<Option<Arc<dyn ManagedProcess>>>,
    commands_registered: AtomicBool,
    console: Option<Arc<Console>>,
}

impl<S, P, F, I> NodeSupervisor<S, P, F, I>
where
    S: ClientState + 'static,
    P: Prober + 'static,
    F: ProcessFactory + 'static,
    I: IpcChannel + 'static,
{
    pub fn new(config: NodeConfig, bus: EventBus, gate: ReadinessGate<S, P>, factory: F, ipc: Arc<I>) -> Self {
        Self {
            config,
            bus,
            gate,
            factory,
            ipc,
            process: Mutex::new(None),
            commands_registered: AtomicBool::new(false),
            console: None,
        }
    }

    /// Register console commands on this console once the node is launched
    pub fn with_console(mut self, console: Arc<Console>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Whether a managed process is currently held
    pub async fn has_process(&self) -> bool {
        self.process.lock().await.is_some()
    }

    /// Register as launchable service and, as IPC server, answer endpoint queries
    pub async fn register(self: &Arc<Self>) -> SupervisorResult<()> {
        let service: Arc<dyn Launchable> = self.clone();
        self.bus.register_launchable(SERVICE_NAME, service).await;

        if self.ipc.role() == IpcRole::Server {
            let endpoint = self.config.configured_endpoint().map(str::to_string);
            let handler: RequestHandler = Arc::new(move |_| Ok(endpoint.clone()));
            self.ipc.on(NODE_ENDPOINT_TOPIC, handler).await?;
        }
        Ok(())
    }

    /// Client role: stop the local node whenever the server announces a stop
    pub fn follow_peer_stops(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.ipc.role() != IpcRole::Client {
            return None;
        }

        let mut broadcasts = self.ipc.subscribe();
        let supervisor: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            loop {
                match broadcasts.recv().await {
                    Ok(message) if message.topic() == Some(STOP_NODE_TOPIC) => {
                        let Some(supervisor) = supervisor.upgrade() else { break };
                        process_info!(ProcessId::current(), "📣 Peer requested node stop");
                        if let Err(e) = supervisor.stop().await {
                            process_error!(ProcessId::current(), "❌ Failed to stop node on peer request: {}", e);
                        }
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    /// Start the node unless one is already serving
    pub async fn launch(&self) -> SupervisorResult<LaunchOutcome> {
        if self.gate.check_ready(&self.config).await {
            process_info!(ProcessId::current(), "🔗 Blockchain node is already running");
            return Ok(LaunchOutcome::AlreadyRunning);
        }

        let process: Arc<dyn ManagedProcess> = Arc::from(self.factory.create(&self.config, self.bus.clone()));
        {
            let mut slot = self.process.lock().await;
            if let Some(existing) = slot.as_ref().filter(|p| !p.state().is_terminal()) {
                return Err(SupervisorError::process(format!(
                    "{} is already starting or running but not reachable",
                    existing.name()
                )));
            }
            *slot = Some(process.clone());
        }

        // Listen before starting so neither announcement can be missed
        let mut events = self.bus.subscribe();
        process_info!(ProcessId::current(), "🚀 Starting {}", process.name());

        let result = match process.start().await {
            Ok(()) => self.await_confirmation(&mut events).await,
            Err(e) => Err(e),
        };
        drop(events);

        self.register_commands().await;

        match result {
            Ok(()) => {
                process_info!(ProcessId::current(), "✅ {} is ready", process.name());
                Ok(LaunchOutcome::Started)
            }
            Err(e) => {
                if !matches!(e, SupervisorError::ReadyButUnreachable) {
                    let mut slot = self.process.lock().await;
                    if slot.as_ref().is_some_and(|held| Arc::ptr_eq(held, &process)) {
                        *slot = None;
                    }
                }
                process_error!(ProcessId::current(), "❌ {}", e);
                Err(e)
            }
        }
    }

    async fn await_confirmation(&self, events: &mut broadcast::Receiver<BusEvent>) -> SupervisorResult<()> {
        if let Lifecycle::Exited(code) = next_lifecycle(events).await {
            return Err(SupervisorError::ExitedBeforeReady { code });
        }

        // An exit already queued behind the ready announcement wins
        tokio::select! {
            biased;
            code = next_exit(events) => Err(SupervisorError::ExitedBeforeReady { code }),
            ready = self.gate.check_ready(&self.config) => {
                if ready {
                    Ok(())
                } else {
                    Err(SupervisorError::ReadyButUnreachable)
                }
            }
        }
    }

    /// Stop the node; peers are told without waiting for them
    pub async fn stop(&self) -> SupervisorResult<()> {
        if self.ipc.role() == IpcRole::Server {
            self.spawn_stop_broadcast();
        }

        let Some(process) = self.process.lock().await.take() else {
            process_debug!(ProcessId::current(), "⚪ No node process to stop");
            return Ok(());
        };

        if process.state().is_terminal() {
            return Ok(());
        }

        process.stop().await?;
        process_info!(ProcessId::current(), "🛑 {} stopped", process.name());
        Ok(())
    }

    fn spawn_stop_broadcast(&self) {
        let ipc = self.ipc.clone();
        tokio::spawn(async move {
            if !ipc.is_connected() {
                if let Err(e) = ipc.connect().await {
                    process_warn!(ProcessId::current(), "⚠️ Could not reach IPC peers: {}", e);
                    return;
                }
            }
            match ipc.broadcast(STOP_NODE_TOPIC, None).await {
                Ok(()) => process_info!(
                    ProcessId::current(),
                    "The blockchain process has been stopped. It can be restarted by running service blockchain on in the console"
                ),
                Err(e) => process_warn!(ProcessId::current(), "⚠️ Stop broadcast failed: {}", e),
            }
        });
    }

    async fn register_commands(&self) {
        if self.commands_registered.swap(true, Ordering::SeqCst) {
            return;
        }

        for (topic, enabled) in [(LOGS_ENABLE_TOPIC, true), (LOGS_DISABLE_TOPIC, false)] {
            let bus = self.bus.clone();
            let client = self.config.client.clone();
            self.bus
                .set_command_handler(topic, move || {
                    let bus = bus.clone();
                    let message = if enabled {
                        format!("Enabling {client} logs")
                    } else {
                        format!("Disabling {client} logs")
                    };
                    async move {
                        bus.publish(BusEvent::NodeLogs { enabled });
                        Ok(message)
                    }
                })
                .await;
        }

        if let Some(console) = &self.console {
            console
                .register("log blockchain on", ConsoleAction::Request(LOGS_ENABLE_TOPIC.to_string()))
                .await;
            console
                .register("log blockchain off", ConsoleAction::Request(LOGS_DISABLE_TOPIC.to_string()))
                .await;
        }
    }
}

async fn next_lifecycle(events: &mut broadcast::Receiver<BusEvent>) -> Lifecycle {
    loop {
        match events.recv().await {
            Ok(BusEvent::NodeReady) => return Lifecycle::Ready,
            Ok(BusEvent::NodeExited { code }) => return Lifecycle::Exited(code),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return Lifecycle::Exited(None),
        }
    }
}

async fn next_exit(events: &mut broadcast::Receiver<BusEvent>) -> Option<i32> {
    loop {
        if let Lifecycle::Exited(code) = next_lifecycle(events).await {
            return code;
        }
    }
}

#[async_trait]
impl<S, P, F, I> Launchable for NodeSupervisor<S, P, F, I>
where
    S: ClientState + 'static,
    P: Prober + 'static,
    F: ProcessFactory + 'static,
    I: IpcChannel + 'static,
{
    async fn launch(&self) -> SharedResult<()> {
        NodeSupervisor::launch(self)
            .await
            .map(|_| ())
            .map_err(|e| SharedError::service(SERVICE_NAME, e.to_string()))
    }

    async fn stop(&self) -> SharedResult<()> {
        NodeSupervisor::stop(self)
            .await
            .map_err(|e| SharedError::service(SERVICE_NAME, e.to_string()))
    }
}
