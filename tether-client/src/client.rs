use crate::behavior::MeshBehavior;
use crate::config::ClientConfig;
use crate::error::SignalingError;
use crate::link::LinkFactory;
use crate::registry::SessionRegistry;
use crate::relay::{RelayEvent, RelayOutput};
use crate::router::{MembershipProtocol, RouterCommand, SignalingRouter};
use crate::session::{SessionContext, SessionState, SignalingRole};
use std::sync::Arc;
use tether_core::{Base64JsonCodec, Channel, Codec, Payload, PeerId, RoomId};
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle to one local participant's signaling core.
///
/// Creating it spawns the router task, so it must be built inside a tokio runtime.
/// The task runs until [`MeshClient::shutdown`].
#[derive(Clone)]
pub struct MeshClient {
    local_id: PeerId,
    room_id: RoomId,
    channel: Channel,
    registry: SessionRegistry,
    router_tx: mpsc::UnboundedSender<RouterCommand>,
}

impl MeshClient {
    pub fn new(
        config: ClientConfig,
        relay: Arc<dyn RelayOutput>,
        link_factory: Arc<dyn LinkFactory>,
        behavior: Arc<dyn MeshBehavior>,
    ) -> Self {
        Self::with_codec(config, relay, link_factory, behavior, Arc::new(Base64JsonCodec))
    }

    pub fn with_codec(
        config: ClientConfig,
        relay: Arc<dyn RelayOutput>,
        link_factory: Arc<dyn LinkFactory>,
        behavior: Arc<dyn MeshBehavior>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        let (router_tx, router_rx) = mpsc::unbounded_channel();
        let registry = SessionRegistry::new();

        let ctx = Arc::new(SessionContext {
            local_id: config.user_id.clone(),
            room_id: config.room_id.clone(),
            channel: config.channel,
            data_channel_label: config.data_channel_label.clone(),
            tie_break: config.tie_break,
            codec,
            relay,
            behavior,
            link_factory,
            router_tx: router_tx.clone(),
        });
        let membership = MembershipProtocol::new(config.role, config.join_policy);

        let router = SignalingRouter::new(ctx, registry.clone(), membership, router_rx);
        tokio::spawn(router.run());

        Self {
            local_id: config.user_id,
            room_id: config.room_id,
            channel: config.channel,
            registry,
            router_tx,
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Feeds one relay event (envelope or connection status) into the router.
    pub fn handle_relay_event(&self, event: RelayEvent) -> Result<(), SignalingError> {
        self.command(RouterCommand::Relay(event))
    }

    /// Broadcasts our join request; existing participants will call us.
    pub fn join_room(&self) -> Result<(), SignalingError> {
        self.command(RouterCommand::JoinRoom)
    }

    /// Become caller toward `peer_id`. No-op when a session already exists.
    pub fn start_call(&self, peer_id: impl Into<PeerId>) -> Result<(), SignalingError> {
        self.command(RouterCommand::StartCall {
            peer_id: peer_id.into(),
        })
    }

    /// Closes the session with `peer_id`. Returns `false` if there was none.
    pub async fn hangup(&self, peer_id: impl Into<PeerId>) -> Result<bool, SignalingError> {
        let (reply, rx) = oneshot::channel();
        self.command(RouterCommand::Hangup {
            peer_id: peer_id.into(),
            reply,
        })?;
        rx.await.map_err(|_| SignalingError::RouterClosed)
    }

    /// Sends `text` over every open data channel.
    pub fn send_broadcast_message(&self, text: impl Into<String>) -> Result<(), SignalingError> {
        self.command(RouterCommand::Broadcast { text: text.into() })
    }

    /// Sends a payload straight through the relay, bypassing any session.
    pub async fn send_local(
        &self,
        to: Option<PeerId>,
        payload: Payload,
    ) -> Result<(), SignalingError> {
        let (reply, rx) = oneshot::channel();
        self.command(RouterCommand::SendLocal { to, payload, reply })?;
        rx.await.map_err(|_| SignalingError::RouterClosed)?
    }

    /// Peers with a registered session, sorted.
    pub fn peers(&self) -> Vec<PeerId> {
        self.registry.peers()
    }

    pub fn session_state(&self, peer_id: &PeerId) -> Option<SessionState> {
        self.registry.get(peer_id).map(|handle| handle.state())
    }

    pub fn session_role(&self, peer_id: &PeerId) -> Option<SignalingRole> {
        self.registry.get(peer_id).map(|handle| handle.role())
    }

    /// Candidates buffered for a peer that has no session yet.
    pub async fn pending_candidates(&self, peer_id: &PeerId) -> Result<usize, SignalingError> {
        let (reply, rx) = oneshot::channel();
        self.command(RouterCommand::PendingCount {
            peer_id: peer_id.clone(),
            reply,
        })?;
        rx.await.map_err(|_| SignalingError::RouterClosed)
    }

    /// Closes every session and stops the router.
    pub fn shutdown(&self) {
        let _ = self.router_tx.send(RouterCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.router_tx.is_closed()
    }

    fn command(&self, cmd: RouterCommand) -> Result<(), SignalingError> {
        self.router_tx
            .send(cmd)
            .map_err(|_| SignalingError::RouterClosed)
    }
}
