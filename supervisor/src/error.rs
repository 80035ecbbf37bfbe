//! Supervisor-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Endpoint unreachable: {message}")]
    Unreachable { message: String },

    #[error("Node process error: {message}")]
    ProcessError { message: String },

    #[error("Node process exited before it was ready (exit code: {code:?})")]
    ExitedBeforeReady { code: Option<i32> },

    #[error("Node process reports ready but is unreachable; check host, port and protocol in the node config")]
    ReadyButUnreachable,

    #[error("IPC error: {message}")]
    IpcError { message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Unknown console command: {input}")]
    UnknownCommand { input: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SupervisorError {
    pub fn process(message: impl Into<String>) -> Self {
        Self::ProcessError { message: message.into() }
    }

    pub fn ipc(message: impl Into<String>) -> Self {
        Self::IpcError { message: message.into() }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable { message: message.into() }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
