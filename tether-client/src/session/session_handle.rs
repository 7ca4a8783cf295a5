use crate::session::{SessionState, SignalingRole};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_core::{NegotiationMessage, PeerId};
use tokio::sync::{mpsc, watch};

/// Work handed to a running session actor.
#[derive(Debug)]
pub enum SessionInput {
    Negotiation(NegotiationMessage),
    /// Text for the session's open data channels.
    Send(String),
    /// Local hangup.
    Hangup,
    /// The relay went away.
    Disconnect,
}

/// Registry-side view of a session actor. Cloning the `Arc` shares the same actor.
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    peer_id: PeerId,
    input_tx: mpsc::UnboundedSender<SessionInput>,
    state: watch::Receiver<SessionState>,
    role: watch::Receiver<SignalingRole>,
    cancelled: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: u64,
        peer_id: PeerId,
        input_tx: mpsc::UnboundedSender<SessionInput>,
        state: watch::Receiver<SessionState>,
        role: watch::Receiver<SignalingRole>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            peer_id,
            input_tx,
            state,
            role,
            cancelled,
        }
    }

    /// Distinguishes successive sessions for the same peer.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn role(&self) -> SignalingRole {
        *self.role.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Returns `false` once the actor has stopped.
    pub fn send(&self, input: SessionInput) -> bool {
        self.input_tx.send(input).is_ok()
    }

    /// Marks the session dead; in-flight negotiation results are discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
