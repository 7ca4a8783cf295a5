mod membership;
mod router_command;

pub use membership::{JoinDecision, MembershipProtocol};
pub(crate) use router_command::RouterCommand;

use crate::behavior::JoinApproval;
use crate::error::SignalingError;
use crate::pending::PendingCandidateStore;
use crate::registry::SessionRegistry;
use crate::relay::RelayEvent;
use crate::session::{PeerSession, SessionContext, SessionHandle, SessionInput, SessionState, SignalingRole};
use std::sync::Arc;
use tether_core::{NegotiationMessage, Payload, PeerId, SignalEnvelope};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Single entry point for relay traffic and local actions of one participant.
///
/// Commands are handled one at a time; negotiation itself runs inside the
/// per-peer session actors, so a slow link never stalls the router.
pub(crate) struct SignalingRouter {
    ctx: Arc<SessionContext>,
    registry: SessionRegistry,
    pending: PendingCandidateStore,
    membership: MembershipProtocol,
    command_rx: mpsc::UnboundedReceiver<RouterCommand>,
    next_session_id: u64,
}

impl SignalingRouter {
    pub fn new(
        ctx: Arc<SessionContext>,
        registry: SessionRegistry,
        membership: MembershipProtocol,
        command_rx: mpsc::UnboundedReceiver<RouterCommand>,
    ) -> Self {
        Self {
            ctx,
            registry,
            pending: PendingCandidateStore::new(),
            membership,
            command_rx,
            next_session_id: 0,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Signaling router for {:?} in room {:?} started",
            self.ctx.local_id, self.ctx.room_id
        );

        while let Some(cmd) = self.command_rx.recv().await {
            if matches!(cmd, RouterCommand::Shutdown) {
                info!("Shutdown requested for {:?}", self.ctx.local_id);
                break;
            }
            self.handle_command(cmd).await;
        }

        self.close_all();
        info!("Signaling router for {:?} finished", self.ctx.local_id);
    }

    async fn handle_command(&mut self, cmd: RouterCommand) {
        match cmd {
            RouterCommand::Relay(event) => self.handle_relay_event(event).await,

            RouterCommand::JoinRoom => self.join_room().await,

            RouterCommand::StartCall { peer_id } => self.start_call(&peer_id),

            RouterCommand::Hangup { peer_id, reply } => {
                let existed = self.hangup(&peer_id);
                let _ = reply.send(existed);
            }

            RouterCommand::ApproveJoin { peer_id } => {
                info!("Join of {:?} approved", peer_id);
                self.call_joiner(&peer_id);
            }

            RouterCommand::Broadcast { text } => self.broadcast(text),

            RouterCommand::SendLocal { to, payload, reply } => {
                let _ = reply.send(self.send_local(to, payload).await);
            }

            RouterCommand::SessionEnded {
                peer_id,
                session_id,
            } => {
                if self.registry.remove_if_current(&peer_id, session_id) {
                    info!("Session #{} for {:?} removed after link loss", session_id, peer_id);
                    self.pending.discard(&peer_id);
                }
            }

            RouterCommand::PendingCount { peer_id, reply } => {
                let _ = reply.send(self.pending.count(&peer_id));
            }

            RouterCommand::Shutdown => {}
        }
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Envelope(envelope) => self.on_inbound_envelope(envelope).await,

            RelayEvent::Connected => {
                info!("Relay connected for {:?}", self.ctx.local_id);
                if self.membership.should_join_on_connect() {
                    self.join_room().await;
                }
            }

            RelayEvent::Error(msg) => warn!("Relay error: {}", msg),

            RelayEvent::Disconnected => {
                warn!("Relay disconnected; closing {} sessions", self.registry.len());
                self.close_all();
                self.membership.reset();
            }
        }
    }

    async fn on_inbound_envelope(&mut self, envelope: SignalEnvelope) {
        if envelope.from == self.ctx.local_id {
            debug!("Dropping loop-back envelope");
            return;
        }
        if let Some(to) = &envelope.to
            && *to != self.ctx.local_id
        {
            debug!("Dropping envelope for {:?}", to);
            return;
        }
        if let Some(channel) = envelope.channel
            && channel != self.ctx.channel
        {
            return;
        }

        let from = envelope.from;
        match Payload::parse(&envelope.msg, self.ctx.codec.as_ref()) {
            Payload::JoinRequest(channel) if channel == self.ctx.channel => {
                self.on_join_request(from).await;
            }

            Payload::JoinRequest(channel) => {
                debug!("Ignoring {:?} join request from {:?}", channel, from);
            }

            Payload::Negotiation(msg) => {
                if let Err(e) = self.dispatch_negotiation(&from, msg) {
                    warn!("Negotiation from {:?} not delivered: {}", from, e);
                    self.ctx.behavior.on_message(envelope.msg, from).await;
                }
            }

            Payload::Plain(text) => {
                debug!("Plain message from {:?}", from);
                self.ctx.behavior.on_message(text, from).await;
            }
        }
    }

    fn dispatch_negotiation(
        &mut self,
        from: &PeerId,
        msg: NegotiationMessage,
    ) -> Result<(), SignalingError> {
        debug!("Received {} from {:?}", msg.signal_type(), from);

        let handle = match (self.live_session(from), &msg) {
            (Some(handle), _) => handle,
            (None, NegotiationMessage::Offer { .. }) => {
                self.create_session(from, SignalingRole::Answerer)
            }
            (None, NegotiationMessage::Candidate { sdp }) => {
                if !self.pending.push(from.clone(), sdp.clone()) {
                    warn!(
                        "Dropping candidate from {:?}: {} already pending with no offer",
                        from,
                        self.pending.count(from)
                    );
                    return Ok(());
                }
                debug!(
                    "Buffered candidate from {:?} with no session ({} pending)",
                    from,
                    self.pending.count(from)
                );
                return Ok(());
            }
            (None, NegotiationMessage::Answer { .. }) => {
                debug!("Dropping answer from {:?}: no session", from);
                return Ok(());
            }
        };

        if handle.send(SessionInput::Negotiation(msg)) {
            Ok(())
        } else {
            Err(SignalingError::SessionClosed(from.clone()))
        }
    }

    async fn on_join_request(&mut self, joiner: PeerId) {
        match self.membership.decide(&joiner) {
            JoinDecision::Call => self.call_joiner(&joiner),
            JoinDecision::AskApplication => {
                info!("Asking application to confirm join of {:?}", joiner);
                let approval = JoinApproval::new(joiner.clone(), self.ctx.router_tx.clone());
                self.ctx.behavior.on_join_request(joiner, approval).await;
            }
        }
    }

    async fn join_room(&mut self) {
        let envelope = self.ctx.envelope(self.ctx.channel.join_token());
        self.membership.mark_joined();
        info!(
            "Broadcasting join request for {:?} in room {:?}",
            self.ctx.local_id, self.ctx.room_id
        );
        if let Err(e) = self.ctx.relay.send(envelope).await {
            warn!("Failed to send join request: {:?}", e);
        }
    }

    fn start_call(&mut self, peer_id: &PeerId) {
        if *peer_id == self.ctx.local_id {
            warn!("Refusing to call ourselves");
            return;
        }
        if let Some(existing) = self.live_session(peer_id) {
            debug!(
                "Session with {:?} already exists ({}); not calling",
                peer_id,
                existing.state()
            );
            return;
        }
        self.create_session(peer_id, SignalingRole::Offerer);
    }

    /// A session that already finished negotiating belongs to the joiner's
    /// previous run, so it is replaced; one still negotiating is kept.
    fn call_joiner(&mut self, joiner: &PeerId) {
        if let Some(existing) = self.live_session(joiner) {
            let state = existing.state();
            if matches!(state, SessionState::Connected | SessionState::HaveLocalAnswer) {
                info!("{:?} joined again; replacing its {} session", joiner, state);
                self.hangup(joiner);
            }
        }
        self.start_call(joiner);
    }

    fn hangup(&mut self, peer_id: &PeerId) -> bool {
        self.pending.discard(peer_id);
        let Some(handle) = self.registry.remove(peer_id) else {
            debug!("Hangup for {:?}: no session", peer_id);
            return false;
        };
        info!("Hanging up on {:?}", peer_id);
        handle.cancel();
        handle.send(SessionInput::Hangup);
        true
    }

    fn broadcast(&self, text: String) {
        let handles = self.registry.handles();
        if handles.is_empty() {
            debug!("Broadcast with no sessions; nothing sent");
        }
        for handle in handles {
            handle.send(SessionInput::Send(text.clone()));
        }
    }

    async fn send_local(
        &self,
        to: Option<PeerId>,
        payload: Payload,
    ) -> Result<(), SignalingError> {
        let wire = payload.encode(self.ctx.codec.as_ref())?;
        let mut envelope = self.ctx.envelope(wire);
        if let Some(to) = to {
            envelope = envelope.with_to(to);
        }
        self.ctx
            .relay
            .send(envelope)
            .await
            .map_err(|e| SignalingError::Relay(e.to_string()))
    }

    /// Forced close of every session, as on transport loss.
    fn close_all(&mut self) {
        for handle in self.registry.drain() {
            handle.cancel();
            handle.send(SessionInput::Disconnect);
        }
        self.pending.clear();
    }

    /// Registered session that has not closed yet; a closed leftover is evicted.
    fn live_session(&self, peer_id: &PeerId) -> Option<Arc<SessionHandle>> {
        let handle = self.registry.get(peer_id)?;
        if handle.state() == SessionState::Closed {
            self.registry.remove_if_current(peer_id, handle.id());
            return None;
        }
        Some(handle)
    }

    fn create_session(&mut self, peer_id: &PeerId, role: SignalingRole) -> Arc<SessionHandle> {
        let ctx = Arc::clone(&self.ctx);
        let pending = &mut self.pending;
        let next_id = &mut self.next_session_id;

        let (handle, _) = self.registry.get_or_create(peer_id, || {
            *next_id += 1;
            let queue = pending.take(peer_id);
            PeerSession::spawn(ctx, *next_id, peer_id.clone(), role, queue)
        });
        handle
    }
}
