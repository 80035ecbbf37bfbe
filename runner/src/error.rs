//! Runner-specific error types

use std::path::PathBuf;

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("File \"{}\" doesn't exist or you don't have permission to it", path.display())]
    InputError { path: PathBuf },

    #[error("No tests to run")]
    NoTests,

    #[error("Total number of failures: {count}")]
    Failures { count: usize },

    #[error("Could not fetch accounts: {message}")]
    AccountsError { message: String },

    #[error("Compilation failed: {message}")]
    CompileError { message: String },

    #[error("Deployment failed: {message}")]
    DeployError { message: String },

    #[error("Chain request failed: {message}")]
    ChainError { message: String },

    #[error("Test execution failed: {message}")]
    ExecutionError { message: String },

    #[error("Coverage report failed: {message}")]
    CoverageError { message: String },

    #[error("Contract {class_name} is already bound")]
    AlreadyBound { class_name: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl RunnerError {
    pub fn compile(message: impl Into<String>) -> Self {
        Self::CompileError { message: message.into() }
    }

    pub fn deploy(message: impl Into<String>) -> Self {
        Self::DeployError { message: message.into() }
    }

    pub fn chain(message: impl Into<String>) -> Self {
        Self::ChainError { message: message.into() }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError { message: message.into() }
    }

    pub fn coverage(message: impl Into<String>) -> Self {
        Self::CoverageError { message: message.into() }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
