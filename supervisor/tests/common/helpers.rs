//! Test helpers and builder patterns for supervisor tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use shared::{EventBus, IpcRole};
use supervisor::traits::{MockClientState, MockIpcChannel, MockProber, ProcessFactory};
use supervisor::{Console, IpcChannel, NodeConfig, NodeSupervisor, ReadinessGate, SupervisorError};

use super::fixtures::TestFixtures;

/// Builds supervisors around mocked readiness collaborators
pub struct SupervisorBuilder {
    config: NodeConfig,
    bus: EventBus,
    connected: bool,
    reachable_after: Option<usize>,
    probes: Arc<AtomicUsize>,
    console: Option<Arc<Console>>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            bus: EventBus::new(),
            connected: false,
            reachable_after: Some(1),
            probes: Arc::new(AtomicUsize::new(0)),
            console: None,
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_console(mut self, console: Arc<Console>) -> Self {
        self.console = Some(console);
        self
    }

    /// The client reports an existing connection
    pub fn already_connected(mut self) -> Self {
        self.connected = true;
        self
    }

    /// Probes fail forever
    pub fn never_reachable(mut self) -> Self {
        self.reachable_after = None;
        self
    }

    /// Counter of probe calls made through the gate
    pub fn probe_counter(&self) -> Arc<AtomicUsize> {
        self.probes.clone()
    }

    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Probes fail until `reachable_after` of them were made
    fn gate(&self) -> ReadinessGate<MockClientState, MockProber> {
        let mut client_state = MockClientState::new();
        let connected = self.connected;
        client_state.expect_is_connected().returning(move || connected);

        let mut prober = MockProber::new();
        let probes = self.probes.clone();
        let reachable_after = self.reachable_after;
        prober.expect_probe().returning(move |_| {
            let seen = probes.fetch_add(1, Ordering::SeqCst);
            match reachable_after {
                Some(n) if seen >= n => Ok(()),
                _ => Err(SupervisorError::unreachable("connection refused")),
            }
        });

        ReadinessGate::new(client_state, prober)
    }

    pub fn build<F, I>(self, factory: F, ipc: Arc<I>) -> Arc<NodeSupervisor<MockClientState, MockProber, F, I>>
    where
        F: ProcessFactory + 'static,
        I: IpcChannel + 'static,
    {
        let gate = self.gate();
        let supervisor = NodeSupervisor::new(self.config, self.bus, gate, factory, ipc);
        Arc::new(match self.console {
            Some(console) => supervisor.with_console(console),
            None => supervisor,
        })
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// An IPC channel mock that plays no role at all
    pub fn no_ipc() -> Arc<MockIpcChannel> {
        let mut ipc = MockIpcChannel::new();
        ipc.expect_role().return_const(IpcRole::Neither);
        Arc::new(ipc)
    }

    pub async fn eventually<F>(mut condition: F)
    where
        F: FnMut() -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition was not met in time");
    }
}
