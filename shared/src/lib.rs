//! Shared types for the node supervisor and test runner
//!
//! Contains only what both sides need: process identity, the in-process
//! event bus, inter-process message frames and the logging setup.

pub mod bus;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use bus::{BusEvent, CommandFuture, CommandHandler, EventBus, Launchable};
pub use errors::*;
pub use types::*;

pub use messages::{
    // Side-channel telemetry published on the bus
    BlockHeader, ContractReceipt,

    // Per-test reporting
    TestReport, TestState,

    // Supervisor ↔ peer coordination
    IpcMessage, NODE_ENDPOINT_TOPIC, STOP_NODE_TOPIC,
};
