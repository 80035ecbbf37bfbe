//! Service implementations
//!
//! Real implementations of the supervisor traits. These handle the actual
//! I/O: sockets, child processes and the inter-process channel.

pub mod client_state;
pub mod ipc;
pub mod node_process;
pub mod prober;

#[cfg(test)]
mod tests;

pub use client_state::ConnectionFlag;
pub use ipc::TcpIpcChannel;
pub use node_process::{CommandNodeProcess, CommandProcessFactory};
pub use prober::NetworkProber;
