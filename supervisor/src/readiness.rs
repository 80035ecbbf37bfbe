//! Layered readiness check
//!
//! 1. a client that is already connected wins, no probe is sent
//! 2. no configured endpoint counts as connected (kept for compatibility
//!    with existing configs, see `test_absent_endpoint_counts_as_connected`)
//! 3. otherwise one probe decides

use shared::{ProcessId, process_debug};

use crate::config::NodeConfig;
use crate::core::EndpointDescriptor;
use crate::traits::{ClientState, Prober};

pub struct ReadinessGate<S, P>
where
    S: ClientState,
    P: Prober,
{
    client_state: S,
    prober: P,
}

impl<S, P> ReadinessGate<S, P>
where
    S: ClientState,
    P: Prober,
{
    pub fn new(client_state: S, prober: P) -> Self {
        Self { client_state, prober }
    }

    /// Never fails; an unparsable endpoint is treated like a failed probe
    pub async fn check_ready(&self, config: &NodeConfig) -> bool {
        if self.client_state.is_connected().await {
            process_debug!(ProcessId::current(), "🔗 Client already connected, skipping probe");
            return true;
        }

        let Some(endpoint) = config.configured_endpoint() else {
            process_debug!(ProcessId::current(), "⚪ No endpoint configured, nothing to probe");
            return true;
        };

        let descriptor = match EndpointDescriptor::parse(endpoint, config.first_origin()) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                process_debug!(ProcessId::current(), "⚠️ {}", e);
                return false;
            }
        };

        match self.prober.probe(&descriptor).await {
            Ok(()) => {
                process_debug!(ProcessId::current(), "✅ Node reachable at {}", descriptor);
                true
            }
            Err(e) => {
                process_debug!(ProcessId::current(), "🔌 Node not reachable at {}: {}", descriptor, e);
                false
            }
        }
    }
}
