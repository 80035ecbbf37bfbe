//! Node supervisor library
//!
//! Starts and stops an external blockchain node, gates every start behind a
//! layered readiness check and coordinates node shutdown with cooperating
//! processes over the inter-process channel.

pub mod config;
pub mod console;
pub mod core;
pub mod error;
pub mod readiness;
pub mod services;
pub mod supervisor;
pub mod traits;

// Re-export commonly used types
pub use config::NodeConfig;
pub use console::Console;
pub use crate::core::{EndpointDescriptor, TransportType};
pub use error::{SupervisorError, SupervisorResult};
pub use readiness::ReadinessGate;
pub use supervisor::{LaunchOutcome, NodeSupervisor, SERVICE_NAME};
pub use traits::{ClientState, IpcChannel, ManagedProcess, ProcessFactory, ProcessState, Prober, RequestHandler};
