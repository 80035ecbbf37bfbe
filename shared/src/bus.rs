//! In-process command/event bus
//!
//! Three facilities share one handle:
//! - broadcast events (`publish`/`subscribe`); dropping a receiver is how a
//!   listener detaches
//! - single-handler commands (`set_command_handler`/`request`); registering
//!   a topic again replaces the previous handler
//! - launchable services (`register_launchable`/`start_service`/`stop_service`)

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::errors::{SharedError, SharedResult};
use crate::messages::{BlockHeader, ContractReceipt, TestReport};

const EVENT_CAPACITY: usize = 256;

/// Events published on the bus
#[derive(Clone, Debug, PartialEq)]
pub enum BusEvent {
    /// Managed node announced it is ready to serve
    NodeReady,
    /// Managed node process ended
    NodeExited { code: Option<i32> },
    /// Node output forwarding switched on or off
    NodeLogs { enabled: bool },
    /// A block was mined
    BlockHeader(BlockHeader),
    /// A contract deployment finished
    ContractReceipt(ContractReceipt),
    /// A test run started; previous results are void
    TestResultsReset,
    /// A single test finished
    TestResult(TestReport),
    /// Flip whether block gas is accounted to the running test
    ToggleGasListener,
}

pub type CommandFuture = Pin<Box<dyn Future<Output = SharedResult<String>> + Send>>;
pub type CommandHandler = Arc<dyn Fn() -> CommandFuture + Send + Sync>;

/// A unit whose lifecycle is managed by the host
#[async_trait]
pub trait Launchable: Send + Sync {
    async fn launch(&self) -> SharedResult<()>;
    async fn stop(&self) -> SharedResult<()>;
}

#[derive(Clone)]
pub struct EventBus {
    events: broadcast::Sender<BusEvent>,
    commands: Arc<RwLock<HashMap<String, CommandHandler>>>,
    services: Arc<RwLock<HashMap<String, Arc<dyn Launchable>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            commands: Arc::new(RwLock::new(HashMap::new())),
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish an event, returning how many listeners received it
    pub fn publish(&self, event: BusEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.events.subscribe()
    }

    /// Number of attached listeners
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub async fn set_command_handler<F, Fut>(&self, topic: &str, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SharedResult<String>> + Send + 'static,
    {
        let handler: CommandHandler = Arc::new(move || Box::pin(handler()));
        self.commands.write().await.insert(topic.to_string(), handler);
    }

    /// Drop the handler for `topic`; true if one was registered
    pub async fn remove_command_handler(&self, topic: &str) -> bool {
        self.commands.write().await.remove(topic).is_some()
    }

    pub async fn has_command_handler(&self, topic: &str) -> bool {
        self.commands.read().await.contains_key(topic)
    }

    /// Invoke the handler registered for `topic`
    pub async fn request(&self, topic: &str) -> SharedResult<String> {
        let handler = self
            .commands
            .read()
            .await
            .get(topic)
            .cloned()
            .ok_or_else(|| SharedError::NoCommandHandler {
                topic: topic.to_string(),
            })?;
        handler().await
    }

    pub async fn register_launchable(&self, name: &str, service: Arc<dyn Launchable>) {
        self.services.write().await.insert(name.to_string(), service);
    }

    async fn service(&self, name: &str) -> SharedResult<Arc<dyn Launchable>> {
        self.services
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SharedError::UnknownService { name: name.to_string() })
    }

    pub async fn start_service(&self, name: &str) -> SharedResult<()> {
        self.service(name).await?.launch().await
    }

    pub async fn stop_service(&self, name: &str) -> SharedResult<()> {
        self.service(name).await?.stop().await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
