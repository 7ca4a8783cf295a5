mod ws_transport;

pub use ws_transport::{WsRelayTransport, forward_relay_events};

use anyhow::Result;
use async_trait::async_trait;
use tether_core::SignalEnvelope;

/// What the relay hands to the router: traffic plus connection status.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Envelope(SignalEnvelope),
    Connected,
    Error(String),
    Disconnected,
}

/// Outbound half of the relay; the router and every session send through it.
#[async_trait]
pub trait RelayOutput: Send + Sync {
    async fn send(&self, envelope: SignalEnvelope) -> Result<()>;
}
