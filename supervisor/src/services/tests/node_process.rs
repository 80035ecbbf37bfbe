//! Tests for the child-process backed node
//!
//! `sh` stands in for the node executable.

use shared::{BusEvent, EventBus};
use tokio::sync::broadcast;

use super::common::with_timeout;
use crate::config::NodeConfig;
use crate::services::node_process::{CommandNodeProcess, CommandProcessFactory};
use crate::traits::{ManagedProcess, ProcessFactory, ProcessState};

fn shell(script: &str) -> NodeConfig {
    NodeConfig::default()
        .with_client("sh", vec!["-c".to_string(), script.to_string()])
        .with_ready_marker("node ready")
}

async fn next_lifecycle_event(events: &mut broadcast::Receiver<BusEvent>) -> BusEvent {
    with_timeout(async {
        loop {
            match events.recv().await {
                Ok(event @ (BusEvent::NodeReady | BusEvent::NodeExited { .. })) => return event,
                Ok(_) => continue,
                Err(e) => panic!("bus closed: {e}"),
            }
        }
    })
    .await
    .expect("lifecycle event expected")
}

#[tokio::test]
async fn test_ready_marker_publishes_ready_once() {
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let process = CommandNodeProcess::new(
        shell("echo 'node ready'; echo 'node ready'; sleep 30"),
        bus.clone(),
    );

    process.start().await.unwrap();
    assert_eq!(next_lifecycle_event(&mut events).await, BusEvent::NodeReady);
    assert_eq!(process.state(), ProcessState::Running);

    with_timeout(process.stop()).await.unwrap().unwrap();
    assert_eq!(process.state(), ProcessState::Stopped);

    // The duplicate marker line never produced a second ready
    assert!(matches!(
        next_lifecycle_event(&mut events).await,
        BusEvent::NodeExited { .. }
    ));
}

#[tokio::test]
async fn test_early_exit_publishes_exit_code() {
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let process = CommandNodeProcess::new(shell("exit 3"), bus.clone());

    process.start().await.unwrap();
    assert_eq!(
        next_lifecycle_event(&mut events).await,
        BusEvent::NodeExited { code: Some(3) }
    );
    assert_eq!(process.state(), ProcessState::Exited { code: Some(3) });
}

#[tokio::test]
async fn test_stop_kills_process_ignoring_sigterm() {
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut config = shell("trap '' TERM; echo 'node ready'; while true; do sleep 1; done");
    config.stop_grace_ms = 200;
    let process = CommandNodeProcess::new(config, bus.clone());

    process.start().await.unwrap();
    assert_eq!(next_lifecycle_event(&mut events).await, BusEvent::NodeReady);

    with_timeout(process.stop()).await.unwrap().unwrap();
    assert!(process.state().is_terminal());
}

#[tokio::test]
async fn test_start_twice_fails() {
    let bus = EventBus::new();
    let process = CommandNodeProcess::new(shell("sleep 30"), bus);

    process.start().await.unwrap();
    assert!(process.start().await.is_err());
    process.stop().await.unwrap();
}

#[tokio::test]
async fn test_spawn_failure() {
    let bus = EventBus::new();
    let config = NodeConfig::default().with_client("/no/such/node-binary", Vec::new());
    let process = CommandNodeProcess::new(config, bus);

    assert!(process.start().await.is_err());
    assert!(process.state().is_terminal());
    // Stopping a process that never ran is a no-op
    process.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_before_start_is_noop() {
    let process = CommandNodeProcess::new(shell("sleep 30"), EventBus::new());
    process.stop().await.unwrap();
    assert_eq!(process.state(), ProcessState::Idle);
}

#[tokio::test]
async fn test_factory_creates_idle_process() {
    let factory = CommandProcessFactory;
    let process = factory.create(&shell("true"), EventBus::new());

    assert_eq!(process.name(), "sh");
    assert_eq!(process.state(), ProcessState::Idle);
}
