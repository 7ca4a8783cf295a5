use crate::config::{JoinPolicy, RoomRole};
use tether_core::PeerId;
use tracing::debug;

/// What an existing participant does about a joiner's broadcast join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    /// Become caller toward the joiner right away.
    Call,
    /// Ask the application first; call only once it approves.
    AskApplication,
}

/// Caller election for the broadcast join-request / confirm handshake.
#[derive(Debug, Clone)]
pub struct MembershipProtocol {
    role: RoomRole,
    policy: JoinPolicy,
    joined: bool,
}

impl MembershipProtocol {
    pub fn new(role: RoomRole, policy: JoinPolicy) -> Self {
        Self {
            role,
            policy,
            joined: false,
        }
    }

    pub fn decide(&self, joiner: &PeerId) -> JoinDecision {
        let decision = match (self.role, self.policy) {
            (RoomRole::Master, JoinPolicy::Gatekeeper) => JoinDecision::AskApplication,
            _ => JoinDecision::Call,
        };
        debug!("Join request from {:?}: {:?}", joiner, decision);
        decision
    }

    /// Whether the relay coming up should trigger our own join request.
    /// A master waits for others; a member announces itself once per connection.
    pub fn should_join_on_connect(&self) -> bool {
        self.role == RoomRole::Member && !self.joined
    }

    pub fn mark_joined(&mut self) {
        self.joined = true;
    }

    /// Forget the announcement so the next connection announces again.
    pub fn reset(&mut self) {
        self.joined = false;
    }
}
