//! Shared error types for the supervisor and runner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("No handler registered for command: {topic}")]
    NoCommandHandler { topic: String },

    #[error("Command {topic} failed: {message}")]
    CommandFailed { topic: String, message: String },

    #[error("Unknown service: {name}")]
    UnknownService { name: String },

    #[error("Service {name} failed: {message}")]
    ServiceFailed { name: String, message: String },
}

impl SharedError {
    pub fn service(name: impl Into<String>, message: impl ToString) -> Self {
        Self::ServiceFailed {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
