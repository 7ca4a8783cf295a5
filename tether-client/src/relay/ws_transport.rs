use crate::client::MeshClient;
use crate::relay::{RelayEvent, RelayOutput};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tether_core::{PeerId, RelayFrame, RoomId, SignalEnvelope};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// WebSocket connection to the relay at `{base_url}/join/{room}/c/{user}`.
#[derive(Clone)]
pub struct WsRelayTransport {
    outbound: mpsc::UnboundedSender<Message>,
}

impl WsRelayTransport {
    /// Connects and returns the sending half plus the stream of inbound relay events.
    pub async fn connect(
        base_url: &str,
        room_id: &RoomId,
        user_id: &PeerId,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RelayEvent>)> {
        let url = format!(
            "{}/join/{}/c/{}",
            base_url.trim_end_matches('/'),
            room_id,
            user_id
        );
        info!("Connecting to relay: {}", url);

        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to relay at {}", url))?;
        let (mut sender, mut receiver) = socket.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = sender.send(msg).await {
                    error!("Relay send failed: {}", e);
                    break;
                }
            }
            let _ = sender.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                let event = match frame {
                    Ok(Message::Text(text)) => match parse_frame(text.as_str()) {
                        Some(event) => event,
                        None => continue,
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay socket error: {}", e);
                        let _ = event_tx.send(RelayEvent::Error(e.to_string()));
                        break;
                    }
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            let _ = event_tx.send(RelayEvent::Disconnected);
            info!("Relay connection closed");
        });

        Ok((Self { outbound: out_tx }, event_rx))
    }

    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

#[async_trait]
impl RelayOutput for WsRelayTransport {
    async fn send(&self, envelope: SignalEnvelope) -> Result<()> {
        let json = serde_json::to_string(&envelope).context("Failed to serialize envelope")?;
        debug!("Relay OUT to {:?}: {}", envelope.to, json);
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| anyhow!("relay connection is closed"))
    }
}

fn parse_frame(text: &str) -> Option<RelayEvent> {
    match serde_json::from_str::<RelayFrame>(text) {
        Ok(RelayFrame::Envelope(envelope)) => Some(RelayEvent::Envelope(envelope)),
        Ok(RelayFrame::Status(status)) if status.is_connected() => Some(RelayEvent::Connected),
        Ok(RelayFrame::Status(status)) if status.status >= 400 => {
            Some(RelayEvent::Error(status.msg))
        }
        Ok(RelayFrame::Status(status)) => {
            debug!("Relay status {}: {}", status.status, status.msg);
            None
        }
        Err(e) => {
            warn!("Unrecognized relay frame ({}): {}", e, text);
            None
        }
    }
}

/// Pumps relay events into every client sharing this connection, one flow per client.
pub async fn forward_relay_events(
    mut events: mpsc::UnboundedReceiver<RelayEvent>,
    clients: Vec<MeshClient>,
) {
    while let Some(event) = events.recv().await {
        let last = matches!(event, RelayEvent::Disconnected);
        for client in &clients {
            if client.handle_relay_event(event.clone()).is_err() {
                debug!("Client {} stopped; dropping relay event", client.local_id());
            }
        }
        if last {
            break;
        }
    }
}
