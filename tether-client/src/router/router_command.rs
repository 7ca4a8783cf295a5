use crate::error::SignalingError;
use crate::relay::RelayEvent;
use tether_core::{Payload, PeerId};
use tokio::sync::oneshot;

/// Messages the router actor accepts from the client handle, sessions and approvals.
#[derive(Debug)]
pub(crate) enum RouterCommand {
    /// Traffic or status from the relay transport.
    Relay(RelayEvent),

    /// Broadcast our join request to the room.
    JoinRoom,

    StartCall { peer_id: PeerId },

    Hangup {
        peer_id: PeerId,
        reply: oneshot::Sender<bool>,
    },

    /// The application approved a pending join request.
    ApproveJoin { peer_id: PeerId },

    /// Text for every open data channel.
    Broadcast { text: String },

    SendLocal {
        to: Option<PeerId>,
        payload: Payload,
        reply: oneshot::Sender<Result<(), SignalingError>>,
    },

    /// A session stopped on its own (link failure).
    SessionEnded { peer_id: PeerId, session_id: u64 },

    PendingCount {
        peer_id: PeerId,
        reply: oneshot::Sender<usize>,
    },

    Shutdown,
}
