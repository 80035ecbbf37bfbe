//! Connection URL parsing
//!
//! `http(s)://` and `ws(s)://` URLs map to network transports; `ipc://`,
//! `file://` and bare filesystem paths map to a local socket.

use std::fmt;

use url::Url;

use crate::error::{SupervisorError, SupervisorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Http,
    Ws,
    Ipc,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Http => write!(f, "http"),
            TransportType::Ws => write!(f, "ws"),
            TransportType::Ipc => write!(f, "ipc"),
        }
    }
}

/// Parsed node endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Host name, or socket path for IPC
    pub host: String,
    /// Port, 0 for IPC
    pub port: u16,
    pub transport: TransportType,
    /// URL scheme as written (`http`, `https`, `ws`, `wss`, `ipc`)
    pub protocol: String,
    /// Origin header sent on websocket handshakes
    pub origin: Option<String>,
}

impl EndpointDescriptor {
    pub fn parse(endpoint: &str, origin: Option<&str>) -> SupervisorResult<Self> {
        let endpoint = endpoint.trim();
        let invalid = |reason: &str| SupervisorError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        if endpoint.is_empty() {
            return Err(invalid("empty endpoint"));
        }

        if !endpoint.contains("://") {
            return Ok(Self::ipc(endpoint));
        }

        let url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
        let protocol = url.scheme().to_string();

        let transport = match protocol.as_str() {
            "http" | "https" => TransportType::Http,
            "ws" | "wss" => TransportType::Ws,
            "ipc" | "file" => return Ok(Self::ipc(url.path())),
            other => return Err(invalid(&format!("unsupported protocol {other}"))),
        };

        let host = url.host_str().ok_or_else(|| invalid("missing host"))?.to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            host,
            port,
            transport,
            protocol,
            origin: match transport {
                TransportType::Ws => origin.map(str::to_string),
                _ => None,
            },
        })
    }

    fn ipc(path: &str) -> Self {
        Self {
            host: path.to_string(),
            port: 0,
            transport: TransportType::Ipc,
            protocol: "ipc".to_string(),
            origin: None,
        }
    }

    /// URL suitable for connecting to the endpoint
    pub fn url(&self) -> String {
        match self.transport {
            TransportType::Ipc => self.host.clone(),
            _ => format!("{}://{}:{}", self.protocol, self.host, self.port),
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url(), self.transport)
    }
}
