//! Trait definitions with mockall annotations for testing
//!
//! Every collaborator of the supervisor sits behind one of these traits so
//! the launch/stop state machine can be driven with mocks.

use std::sync::Arc;

use shared::{EventBus, IpcMessage, IpcRole};
use tokio::sync::broadcast;

use crate::config::NodeConfig;
use crate::core::EndpointDescriptor;
use crate::error::SupervisorResult;

/// Answers an IPC query; `Err` travels back to the asking peer as text
pub type RequestHandler = Arc<dyn Fn(Option<String>) -> Result<Option<String>, String> + Send + Sync>;

/// Lifecycle of a managed node process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Exited { code: Option<i32> },
}

impl ProcessState {
    /// The process is gone and cannot be stopped any more
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Stopped | ProcessState::Exited { .. })
    }
}

/// Holder of the live client connection state
#[mockall::automock]
#[async_trait::async_trait]
pub trait ClientState: Send + Sync {
    /// Whether a client connection to the node is already established
    async fn is_connected(&self) -> bool;
}

/// One-shot reachability check
#[mockall::automock]
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// `Ok` when the endpoint accepted a connection
    async fn probe(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()>;
}

/// The external node as an opaque start/stop unit
///
/// Implementations announce readiness and exit on the event bus with
/// `BusEvent::NodeReady` and `BusEvent::NodeExited`.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ManagedProcess: Send + Sync {
    fn name(&self) -> String;

    fn state(&self) -> ProcessState;

    /// Spawn the process; returns once it is spawned, not once it is ready
    async fn start(&self) -> SupervisorResult<()>;

    /// Stop the process and wait until it is gone
    async fn stop(&self) -> SupervisorResult<()>;
}

/// Creates managed processes for a configuration
#[mockall::automock]
pub trait ProcessFactory: Send + Sync {
    fn create(&self, config: &NodeConfig, bus: EventBus) -> Box<dyn ManagedProcess>;
}

/// Request/response and broadcast channel between cooperating processes
#[mockall::automock]
#[async_trait::async_trait]
pub trait IpcChannel: Send + Sync {
    fn role(&self) -> IpcRole;

    fn is_connected(&self) -> bool;

    /// Bind (server) or dial (client) the channel
    async fn connect(&self) -> SupervisorResult<()>;

    /// Server only: deliver a topic to every connected client
    async fn broadcast(&self, topic: &str, payload: Option<String>) -> SupervisorResult<()>;

    /// Server only: answer queries on `topic`
    async fn on(&self, topic: &str, handler: RequestHandler) -> SupervisorResult<()>;

    /// Client only: ask the server and wait for its answer
    async fn request(&self, topic: &str, payload: Option<String>) -> SupervisorResult<Option<String>>;

    /// Client only: broadcasts received from the server
    fn subscribe(&self) -> broadcast::Receiver<IpcMessage>;
}
