use crate::link::{LinkState, RemoteStream};
use crate::router::RouterCommand;
use async_trait::async_trait;
use tether_core::PeerId;
use tokio::sync::mpsc;
use tracing::warn;

/// Application hooks the signaling core calls into.
#[async_trait]
pub trait MeshBehavior: Send + Sync + 'static {
    /// Text from a peer: data-channel traffic or a relay payload that was not negotiation.
    async fn on_message(&self, text: String, from: PeerId);

    async fn on_remote_stream(&self, stream: RemoteStream, from: PeerId);

    async fn on_connection_state(&self, peer_id: PeerId, state: LinkState);

    /// A data channel to `peer_id` became usable for sending.
    async fn on_channel_open(&self, _peer_id: PeerId, _label: String) {}

    /// Only called on a gatekeeping room master. Must return promptly; keep the
    /// `approval` and call [`JoinApproval::approve`] whenever the user decides.
    async fn on_join_request(&self, peer_id: PeerId, approval: JoinApproval);
}

/// One-shot permission slip for a pending join request.
///
/// Dropping it without approving leaves the joiner waiting forever, which is
/// how a rejection looks from the other side.
#[derive(Debug)]
pub struct JoinApproval {
    peer_id: PeerId,
    router_tx: mpsc::UnboundedSender<RouterCommand>,
}

impl JoinApproval {
    pub(crate) fn new(peer_id: PeerId, router_tx: mpsc::UnboundedSender<RouterCommand>) -> Self {
        Self { peer_id, router_tx }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn approve(self) {
        let cmd = RouterCommand::ApproveJoin {
            peer_id: self.peer_id.clone(),
        };
        if self.router_tx.send(cmd).is_err() {
            warn!("Join approval for {} arrived after shutdown", self.peer_id);
        }
    }
}
