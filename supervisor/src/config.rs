//! Node configuration
//!
//! Loaded from a JSON file (camelCase keys) and adjusted with fluent setters
//! from command line overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{SupervisorError, SupervisorResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
    /// Connection URL of the node; `None` disables network probing
    pub endpoint: Option<String>,
    /// Comma separated origins accepted by the node's websocket server
    pub ws_origins: String,
    /// Node executable
    pub client: String,
    /// Arguments passed to the node executable
    pub args: Vec<String>,
    /// Output line fragment announcing the node is serving
    pub ready_marker: String,
    /// Time allowed for a graceful stop before the node is killed
    pub stop_grace_ms: u64,
    /// Upper bound for a single connectivity probe
    pub probe_timeout_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            endpoint: Some("http://localhost:8545".to_string()),
            ws_origins: "http://localhost:8000".to_string(),
            client: "geth".to_string(),
            args: vec!["--dev".to_string(), "--http".to_string()],
            ready_marker: "HTTP server started".to_string(),
            stop_grace_ms: 5000,
            probe_timeout_ms: 3000,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> SupervisorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SupervisorError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Configure endpoint (fluent API)
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Configure accepted websocket origins (fluent API)
    pub fn with_ws_origins(mut self, origins: impl Into<String>) -> Self {
        self.ws_origins = origins.into();
        self
    }

    /// Configure node command line (fluent API)
    pub fn with_client(mut self, client: impl Into<String>, args: Vec<String>) -> Self {
        self.client = client.into();
        self.args = args;
        self
    }

    /// Configure ready marker (fluent API)
    pub fn with_ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = marker.into();
        self
    }

    /// Endpoint if one is configured and non-blank
    pub fn configured_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// First configured websocket origin
    pub fn first_origin(&self) -> Option<&str> {
        self.ws_origins.split(',').map(str::trim).find(|o| !o.is_empty())
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_blank_endpoint_is_not_configured() {
        let config = NodeConfig::default().with_endpoint(Some("  ".to_string()));
        assert_eq!(config.configured_endpoint(), None);

        let config = NodeConfig::default().with_endpoint(None);
        assert_eq!(config.configured_endpoint(), None);
    }

    #[test]
    fn test_first_origin() {
        let config = NodeConfig::default().with_ws_origins("http://a:8000, http://b:8000");
        assert_eq!(config.first_origin(), Some("http://a:8000"));

        let config = NodeConfig::default().with_ws_origins("");
        assert_eq!(config.first_origin(), None);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoint": "ws://localhost:8546", "readyMarker": "WebSocket enabled"}}"#).unwrap();

        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.configured_endpoint(), Some("ws://localhost:8546"));
        assert_eq!(config.ready_marker, "WebSocket enabled");
        assert_eq!(config.client, "geth");
    }

    #[test]
    fn test_from_missing_file() {
        let result = NodeConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(SupervisorError::ConfigurationError { .. })));
    }
}
