//! Transport-aware connectivity probe
//!
//! - http: any HTTP response counts, only transport errors fail
//! - ws: complete a websocket handshake (with Origin) and close it again
//! - ipc: connect to the unix socket

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use crate::core::{EndpointDescriptor, TransportType};
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::Prober;

pub struct NetworkProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn probe_http(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()> {
        self.client
            .get(endpoint.url())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| SupervisorError::unreachable(e.to_string()))
    }

    async fn probe_ws(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()> {
        let mut request = endpoint
            .url()
            .into_client_request()
            .map_err(|e| SupervisorError::unreachable(e.to_string()))?;

        if let Some(origin) = &endpoint.origin {
            let value = HeaderValue::from_str(origin)
                .map_err(|_| SupervisorError::config(format!("invalid websocket origin {origin}")))?;
            request.headers_mut().insert("Origin", value);
        }

        let (mut stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| SupervisorError::unreachable(e.to_string()))?;
        let _ = stream.close(None).await;
        Ok(())
    }

    #[cfg(unix)]
    async fn probe_ipc(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()> {
        tokio::net::UnixStream::connect(&endpoint.host)
            .await
            .map(|_| ())
            .map_err(|e| SupervisorError::unreachable(format!("{}: {e}", endpoint.host)))
    }

    #[cfg(not(unix))]
    async fn probe_ipc(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()> {
        Err(SupervisorError::unreachable(format!(
            "{}: IPC endpoints are only supported on unix",
            endpoint.host
        )))
    }
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, endpoint: &EndpointDescriptor) -> SupervisorResult<()> {
        let attempt = async {
            match endpoint.transport {
                TransportType::Http => self.probe_http(endpoint).await,
                TransportType::Ws => self.probe_ws(endpoint).await,
                TransportType::Ipc => self.probe_ipc(endpoint).await,
            }
        };

        timeout(self.timeout, attempt)
            .await
            .map_err(|_| SupervisorError::unreachable(format!("{endpoint} timed out after {:?}", self.timeout)))?
    }
}
