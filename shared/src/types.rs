//! Core types used across the supervisor and the test runner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Reported by `ProcessId::current()` before any `init_*` call (unit tests, library use)
static UNASSIGNED: ProcessId = ProcessId::Unassigned;

/// Process identifier for any component in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Process owning the node and the IPC server role
    Supervisor,
    /// Test runner process
    Runner,
    /// Cooperating process attached as an IPC client
    Peer(u32),
    /// Identity not initialised yet
    Unassigned,
}

impl ProcessId {
    /// Initialize the global process ID for the supervisor
    pub fn init_supervisor() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Supervisor)
    }

    /// Initialize the global process ID for the test runner
    pub fn init_runner() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Runner)
    }

    /// Initialize the global process ID for a peer with explicit number
    pub fn init_peer(id: u32) -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Peer(id))
    }

    /// Get the global process ID
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&UNASSIGNED)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Supervisor => write!(f, "supervisor"),
            ProcessId::Runner => write!(f, "runner"),
            ProcessId::Peer(id) => write!(f, "peer_{id}"),
            ProcessId::Unassigned => write!(f, "unassigned"),
        }
    }
}

/// Role a process plays on the inter-process channel
///
/// At most one server exists per coordination domain; it answers peer
/// queries and broadcasts. Clients only ask and listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IpcRole {
    Server,
    Client,
    #[default]
    Neither,
}

impl fmt::Display for IpcRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcRole::Server => write!(f, "server"),
            IpcRole::Client => write!(f, "client"),
            IpcRole::Neither => write!(f, "neither"),
        }
    }
}

impl std::str::FromStr for IpcRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" => Ok(IpcRole::Server),
            "client" => Ok(IpcRole::Client),
            "neither" | "none" => Ok(IpcRole::Neither),
            _ => Err(format!("Unknown IPC role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId::Supervisor.to_string(), "supervisor");
        assert_eq!(ProcessId::Runner.to_string(), "runner");
        assert_eq!(ProcessId::Peer(3).to_string(), "peer_3");
    }

    #[test]
    fn test_ipc_role_parsing() {
        assert_eq!("Server".parse::<IpcRole>(), Ok(IpcRole::Server));
        assert_eq!("client".parse::<IpcRole>(), Ok(IpcRole::Client));
        assert_eq!("none".parse::<IpcRole>(), Ok(IpcRole::Neither));
        assert!("leader".parse::<IpcRole>().is_err());
    }
}
