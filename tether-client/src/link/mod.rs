mod link_event;
mod webrtc_link;

pub use link_event::{LinkEvent, LinkState, RemoteStream, TrackKind};
pub use webrtc_link::{WebRtcLink, WebRtcLinkFactory};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{IceCandidate, PeerId, SessionDescription};
use tokio::sync::mpsc;

/// Command surface of the peer-to-peer engine a session drives.
///
/// Asynchronous happenings (local candidates, channels opening, inbound data,
/// state changes) are not callbacks on this trait: the link pushes them as
/// [`LinkEvent`]s into the sink it was created with.
#[async_trait]
pub trait NegotiableLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Open a local data channel; `LinkEvent::ChannelOpen` follows once it is usable.
    async fn create_data_channel(&self, label: &str) -> Result<()>;

    async fn send_text(&self, label: &str, text: &str) -> Result<()>;

    /// Stops every local resource owned by the link.
    async fn close(&self) -> Result<()>;
}

/// Builds one link per remote participant.
#[async_trait]
pub trait LinkFactory: Send + Sync {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<LinkEvent>,
    ) -> Result<Arc<dyn NegotiableLink>>;
}
