//! Message types exchanged inside and between processes
//!
//! - `ipc`: supervisor ↔ peer frames on the inter-process channel
//! - `chain`: side-channel telemetry published while a node is running
//! - `testing`: per-test result reports

pub mod chain;
pub mod ipc;
pub mod testing;

pub use chain::{BlockHeader, ContractReceipt};
pub use ipc::{IpcMessage, NODE_ENDPOINT_TOPIC, STOP_NODE_TOPIC};
pub use testing::{TestReport, TestState};
