//! Frames exchanged over the inter-process channel
//!
//! Payloads travel as JSON text so that bincode framing never has to
//! describe arbitrary values.

use serde::{Deserialize, Serialize};

/// Query answered by the server with the configured node endpoint
pub const NODE_ENDPOINT_TOPIC: &str = "blockchain:node";

/// Broadcast telling every peer to stop its node
pub const STOP_NODE_TOPIC: &str = "process:blockchain:stop";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum IpcMessage {
    /// Client → server question
    Request {
        id: u64,
        topic: String,
        payload: Option<String>,
    },
    /// Server → client answer for `Request { id }`
    Reply {
        id: u64,
        payload: Option<String>,
        error: Option<String>,
    },
    /// Server → every client
    Broadcast { topic: String, payload: Option<String> },
}

impl IpcMessage {
    pub fn broadcast(topic: impl Into<String>) -> Self {
        Self::Broadcast {
            topic: topic.into(),
            payload: None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match self {
            IpcMessage::Request { topic, .. } | IpcMessage::Broadcast { topic, .. } => Some(topic),
            IpcMessage::Reply { .. } => None,
        }
    }
}
