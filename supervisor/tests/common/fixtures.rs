//! Test fixtures for supervisor tests
//!
//! `FakeNodeProcess` replays a scripted sequence of lifecycle events on the
//! bus when started, standing in for a real node executable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shared::{BusEvent, EventBus};
use supervisor::traits::{ManagedProcess, ProcessFactory, ProcessState};
use supervisor::{NodeConfig, SupervisorResult};

/// Standard test data
pub struct TestFixtures;

impl TestFixtures {
    pub const ENDPOINT: &'static str = "http://localhost:8545";
    pub const CLIENT: &'static str = "geth";

    pub fn config() -> NodeConfig {
        NodeConfig::default().with_endpoint(Some(Self::ENDPOINT.to_string()))
    }

    pub fn ready() -> Vec<BusEvent> {
        vec![BusEvent::NodeReady]
    }

    pub fn exited(code: i32) -> Vec<BusEvent> {
        vec![BusEvent::NodeExited { code: Some(code) }]
    }
}

/// Scripted stand-in for a node process
pub struct FakeNodeProcess {
    bus: EventBus,
    script: Vec<BusEvent>,
    delay: Option<Duration>,
    state: Arc<Mutex<ProcessState>>,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl ManagedProcess for FakeNodeProcess {
    fn name(&self) -> String {
        TestFixtures::CLIENT.to_string()
    }

    fn state(&self) -> ProcessState {
        *self.state.lock().unwrap()
    }

    async fn start(&self) -> SupervisorResult<()> {
        *self.state.lock().unwrap() = ProcessState::Starting;

        let publish = {
            let bus = self.bus.clone();
            let script = self.script.clone();
            let state = self.state.clone();
            move || {
                for event in script {
                    match &event {
                        BusEvent::NodeReady => *state.lock().unwrap() = ProcessState::Running,
                        BusEvent::NodeExited { code } => *state.lock().unwrap() = ProcessState::Exited { code: *code },
                        _ => {}
                    }
                    bus.publish(event);
                }
            }
        };

        match self.delay {
            // Announce before start() returns
            None => publish(),
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    publish();
                });
            }
        }
        Ok(())
    }

    async fn stop(&self) -> SupervisorResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = ProcessState::Stopped;
        self.bus.publish(BusEvent::NodeExited { code: None });
        Ok(())
    }
}

/// Factory handing out `FakeNodeProcess`es that share counters
#[derive(Clone, Default)]
pub struct FakeFactory {
    script: Vec<BusEvent>,
    delay: Option<Duration>,
    pub created: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn scripted(script: Vec<BusEvent>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Publish the script from a task after `delay` instead of inside start()
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ProcessFactory for FakeFactory {
    fn create(&self, _config: &NodeConfig, bus: EventBus) -> Box<dyn ManagedProcess> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeNodeProcess {
            bus,
            script: self.script.clone(),
            delay: self.delay,
            state: Arc::new(Mutex::new(ProcessState::Idle)),
            stops: self.stops.clone(),
        })
    }
}
