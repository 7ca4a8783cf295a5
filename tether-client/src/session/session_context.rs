use crate::behavior::MeshBehavior;
use crate::link::LinkFactory;
use crate::relay::RelayOutput;
use crate::router::RouterCommand;
use std::sync::Arc;
use tether_core::{Channel, Codec, PeerId, RoomId, SignalEnvelope};
use tokio::sync::mpsc;

/// Everything a session needs from its local participant, shared by all sessions.
pub(crate) struct SessionContext {
    pub local_id: PeerId,
    pub room_id: RoomId,
    pub channel: Channel,
    pub data_channel_label: String,
    pub tie_break: bool,
    pub codec: Arc<dyn Codec>,
    pub relay: Arc<dyn RelayOutput>,
    pub behavior: Arc<dyn MeshBehavior>,
    pub link_factory: Arc<dyn LinkFactory>,
    pub router_tx: mpsc::UnboundedSender<RouterCommand>,
}

impl SessionContext {
    /// Envelope from the local participant, tagged with this flow's channel and room.
    pub fn envelope(&self, msg: impl Into<String>) -> SignalEnvelope {
        SignalEnvelope::new(self.local_id.clone(), msg)
            .with_channel(self.channel)
            .with_room(self.room_id.clone())
    }
}
