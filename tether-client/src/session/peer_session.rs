use crate::link::{LinkEvent, LinkState, NegotiableLink};
use crate::pending::PendingCandidateQueue;
use crate::router::RouterCommand;
use crate::session::{SessionContext, SessionHandle, SessionInput, SessionState, SignalingRole};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_core::{Channel, IceCandidate, NegotiationMessage, PeerId, SessionDescription};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const LINK_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Hangup,
    Disconnect,
    LinkLost,
    /// The link could not be built or the call could not start.
    Failed,
}

/// Actor owning the negotiable link toward one remote participant.
pub(crate) struct PeerSession {
    id: u64,
    peer_id: PeerId,
    ctx: Arc<SessionContext>,
    role_tx: watch::Sender<SignalingRole>,
    link: Option<Arc<dyn NegotiableLink>>,
    link_rx: mpsc::Receiver<LinkEvent>,
    input_rx: mpsc::UnboundedReceiver<SessionInput>,
    state_tx: watch::Sender<SessionState>,
    cancelled: Arc<AtomicBool>,
    /// `Some` until a remote description is set; drained exactly once.
    pending: Option<PendingCandidateQueue>,
    open_channels: Vec<String>,
}

impl PeerSession {
    /// Starts the actor. An `Offerer` begins its call as soon as the link exists.
    pub fn spawn(
        ctx: Arc<SessionContext>,
        id: u64,
        peer_id: PeerId,
        role: SignalingRole,
        pending: PendingCandidateQueue,
    ) -> SessionHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::New);
        let (role_tx, role_rx) = watch::channel(role);
        let (link_tx, link_rx) = mpsc::channel(LINK_EVENT_BUFFER);
        let cancelled = Arc::new(AtomicBool::new(false));

        let session = PeerSession {
            id,
            peer_id: peer_id.clone(),
            ctx,
            role_tx,
            link: None,
            link_rx,
            input_rx,
            state_tx,
            cancelled: Arc::clone(&cancelled),
            pending: Some(pending),
            open_channels: Vec::new(),
        };
        tokio::spawn(session.run(link_tx));

        SessionHandle::new(id, peer_id, input_tx, state_rx, role_rx, cancelled)
    }

    async fn run(mut self, link_tx: mpsc::Sender<LinkEvent>) {
        info!(
            "Session #{} for {:?} started ({:?})",
            self.id,
            self.peer_id,
            self.role()
        );

        match self.ctx.link_factory.create(self.peer_id.clone(), link_tx).await {
            Ok(link) => self.link = Some(link),
            Err(e) => {
                error!("Failed to create link for {:?}: {:?}", self.peer_id, e);
                self.teardown(Teardown::Failed).await;
                return;
            }
        }

        if self.role() == SignalingRole::Offerer
            && let Err(e) = self.start_call().await
        {
            error!("Failed to start call to {:?}: {:?}", self.peer_id, e);
            self.teardown(Teardown::Failed).await;
            return;
        }

        loop {
            tokio::select! {
                input = self.input_rx.recv() => {
                    match input {
                        Some(SessionInput::Hangup) => {
                            self.teardown(Teardown::Hangup).await;
                            break;
                        }
                        Some(SessionInput::Disconnect) => {
                            self.teardown(Teardown::Disconnect).await;
                            break;
                        }
                        Some(input) => self.handle_input(input).await,
                        None => {
                            debug!("Handle for {:?} dropped. Closing session.", self.peer_id);
                            self.teardown(Teardown::Hangup).await;
                            break;
                        }
                    }
                }

                evt = self.link_rx.recv() => {
                    match evt {
                        Some(e) => {
                            if !self.handle_link_event(e).await {
                                break;
                            }
                        }
                        None => {
                            warn!("Link event channel for {:?} closed unexpectedly", self.peer_id);
                            self.teardown(Teardown::LinkLost).await;
                            break;
                        }
                    }
                }
            }
        }

        info!("Session #{} for {:?} finished", self.id, self.peer_id);
    }

    async fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::Negotiation(msg) => {
                let kind = msg.signal_type();
                if let Err(e) = self.handle_negotiation(msg).await {
                    warn!("Failed to apply {} from {:?}: {:?}", kind, self.peer_id, e);
                }
            }

            SessionInput::Send(text) => self.send_text(&text).await,

            SessionInput::Hangup | SessionInput::Disconnect => {}
        }
    }

    async fn handle_negotiation(&mut self, msg: NegotiationMessage) -> Result<()> {
        match msg {
            NegotiationMessage::Offer { sdp } => self.on_remote_offer(sdp).await,
            NegotiationMessage::Answer { sdp } => self.on_remote_answer(sdp).await,
            NegotiationMessage::Candidate { sdp } => self.on_remote_candidate(sdp).await,
        }
    }

    async fn start_call(&mut self) -> Result<()> {
        self.set_role(SignalingRole::Offerer);
        let link = self.link()?;

        if self.ctx.channel == Channel::Data {
            link.create_data_channel(&self.ctx.data_channel_label)
                .await
                .context("Failed to create data channel")?;
        }

        let offer = link.create_offer().await.context("Failed to create offer")?;
        if self.is_cancelled() {
            return Ok(());
        }
        link.set_local_description(offer.clone())
            .await
            .context("Failed to set local offer")?;
        if self.is_cancelled() {
            return Ok(());
        }

        self.set_state(SessionState::HaveLocalOffer);
        self.emit(NegotiationMessage::Offer { sdp: offer }).await
    }

    async fn on_remote_offer(&mut self, offer: SessionDescription) -> Result<()> {
        let state = self.state();
        if !state.accepts_offer() {
            debug!("Ignoring offer from {:?} in state {}", self.peer_id, state);
            return Ok(());
        }

        if state == SessionState::HaveLocalOffer && self.ctx.tie_break {
            if self.ctx.local_id < self.peer_id {
                debug!(
                    "Both sides offered; keeping caller role toward {:?}",
                    self.peer_id
                );
                return Ok(());
            }
            info!("Both sides offered; yielding caller role to {:?}", self.peer_id);
            self.replace_link().await?;
        }

        let link = self.link()?;
        link.set_remote_description(offer)
            .await
            .context("Failed to set remote offer")?;
        self.set_role(SignalingRole::Answerer);
        let queued = self.pending.take();
        if self.is_cancelled() {
            return Ok(());
        }
        self.set_state(SessionState::HaveRemoteOffer);

        let answered = self.answer(&link).await;
        if let Some(queue) = queued {
            self.apply_candidates(&link, queue).await;
        }
        answered
    }

    async fn answer(&mut self, link: &Arc<dyn NegotiableLink>) -> Result<()> {
        let answer = link.create_answer().await.context("Failed to create answer")?;
        if self.is_cancelled() {
            return Ok(());
        }
        link.set_local_description(answer.clone())
            .await
            .context("Failed to set local answer")?;
        if self.is_cancelled() {
            return Ok(());
        }

        self.set_state(SessionState::HaveLocalAnswer);
        self.emit(NegotiationMessage::Answer { sdp: answer }).await
    }

    async fn on_remote_answer(&mut self, answer: SessionDescription) -> Result<()> {
        let state = self.state();
        if state != SessionState::HaveLocalOffer {
            debug!("Ignoring answer from {:?} in state {}", self.peer_id, state);
            return Ok(());
        }

        let link = self.link()?;
        link.set_remote_description(answer)
            .await
            .context("Failed to set remote answer")?;
        let queued = self.pending.take();
        if self.is_cancelled() {
            return Ok(());
        }

        self.set_state(SessionState::Connected);
        if let Some(queue) = queued {
            self.apply_candidates(&link, queue).await;
        }
        Ok(())
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        if let Some(queue) = self.pending.as_mut() {
            queue.push(candidate);
            debug!(
                "Buffered candidate from {:?} ({} pending)",
                self.peer_id,
                queue.len()
            );
            return Ok(());
        }

        self.link()?
            .add_ice_candidate(candidate)
            .await
            .context("Failed to add ICE candidate")
    }

    async fn apply_candidates(
        &self,
        link: &Arc<dyn NegotiableLink>,
        queue: PendingCandidateQueue,
    ) {
        if queue.is_empty() {
            return;
        }
        debug!(
            "Applying {} buffered candidates from {:?}",
            queue.len(),
            self.peer_id
        );
        for candidate in queue.drain() {
            if self.is_cancelled() {
                return;
            }
            if let Err(e) = link.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered candidate for {:?}: {:?}", self.peer_id, e);
            }
        }
    }

    /// Drops the current link and starts over with a fresh one in `New`.
    async fn replace_link(&mut self) -> Result<()> {
        if let Some(old) = self.link.take()
            && let Err(e) = old.close().await
        {
            warn!("Failed to close superseded link to {:?}: {:?}", self.peer_id, e);
        }
        self.open_channels.clear();

        let (link_tx, link_rx) = mpsc::channel(LINK_EVENT_BUFFER);
        self.link_rx = link_rx;
        let link = self
            .ctx
            .link_factory
            .create(self.peer_id.clone(), link_tx)
            .await
            .context("Failed to recreate link")?;
        self.link = Some(link);
        self.set_state(SessionState::New);
        Ok(())
    }

    /// Returns `false` when the session must stop.
    async fn handle_link_event(&mut self, event: LinkEvent) -> bool {
        match event {
            LinkEvent::LocalCandidate(candidate) => {
                if let Err(e) = self
                    .emit(NegotiationMessage::Candidate { sdp: candidate })
                    .await
                {
                    warn!("Failed to forward local candidate to {:?}: {:?}", self.peer_id, e);
                }
            }

            LinkEvent::ChannelOpen(label) => {
                info!("Channel '{}' to {:?} is open", label, self.peer_id);
                if !self.open_channels.contains(&label) {
                    self.open_channels.push(label.clone());
                }
                self.ctx
                    .behavior
                    .on_channel_open(self.peer_id.clone(), label)
                    .await;
            }

            LinkEvent::ChannelClosed(label) => {
                debug!("Channel '{}' to {:?} closed", label, self.peer_id);
                self.open_channels.retain(|l| *l != label);
            }

            LinkEvent::Message { label, data } => {
                debug!("Message on '{}' from {:?}", label, self.peer_id);
                let text = String::from_utf8_lossy(&data).into_owned();
                self.ctx.behavior.on_message(text, self.peer_id.clone()).await;
            }

            LinkEvent::RemoteStream(stream) => {
                info!(
                    "Remote {:?} track {} from {:?}",
                    stream.kind, stream.track_id, self.peer_id
                );
                self.ctx
                    .behavior
                    .on_remote_stream(stream, self.peer_id.clone())
                    .await;
            }

            LinkEvent::StateChanged(state) => {
                info!("Link to {:?} is now {:?}", self.peer_id, state);
                self.ctx
                    .behavior
                    .on_connection_state(self.peer_id.clone(), state)
                    .await;

                if state == LinkState::Connected && self.state() != SessionState::Closed {
                    self.set_state(SessionState::Connected);
                }
                if state.is_terminal() {
                    self.teardown(Teardown::LinkLost).await;
                    return false;
                }
            }
        }
        true
    }

    async fn send_text(&self, text: &str) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        if self.open_channels.is_empty() {
            debug!("No open channel to {:?}; message dropped", self.peer_id);
            return;
        }
        for label in &self.open_channels {
            if let Err(e) = link.send_text(label, text).await {
                warn!("Failed to send on '{}' to {:?}: {:?}", label, self.peer_id, e);
            }
        }
    }

    async fn emit(&self, msg: NegotiationMessage) -> Result<()> {
        let wire = self.ctx.codec.encode(&msg)?;
        debug!("Sending {} to {:?}", msg.signal_type(), self.peer_id);
        let envelope = self.ctx.envelope(wire).with_to(self.peer_id.clone());
        self.ctx.relay.send(envelope).await
    }

    async fn teardown(&mut self, reason: Teardown) {
        if let Some(link) = self.link.take()
            && let Err(e) = link.close().await
        {
            warn!("Failed to close link to {:?}: {:?}", self.peer_id, e);
        }
        self.pending = None;
        self.open_channels.clear();
        self.set_state(SessionState::Closed);

        match reason {
            Teardown::Hangup | Teardown::Disconnect => {
                self.ctx
                    .behavior
                    .on_connection_state(self.peer_id.clone(), LinkState::Closed)
                    .await;
            }
            Teardown::Failed => {
                self.ctx
                    .behavior
                    .on_connection_state(self.peer_id.clone(), LinkState::Failed)
                    .await;
            }
            Teardown::LinkLost => {}
        }

        if matches!(reason, Teardown::LinkLost | Teardown::Failed) {
            let cmd = RouterCommand::SessionEnded {
                peer_id: self.peer_id.clone(),
                session_id: self.id,
            };
            if self.ctx.router_tx.send(cmd).is_err() {
                debug!("Router gone while ending session for {:?}", self.peer_id);
            }
        }
    }

    fn link(&self) -> Result<Arc<dyn NegotiableLink>> {
        self.link
            .clone()
            .ok_or_else(|| anyhow!("no link to {}", self.peer_id))
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn role(&self) -> SignalingRole {
        *self.role_tx.borrow()
    }

    fn set_role(&self, role: SignalingRole) {
        self.role_tx.send_replace(role);
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Session {:?}: {} -> {}", self.peer_id, previous, state);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
