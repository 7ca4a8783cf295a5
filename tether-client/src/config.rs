use tether_core::{Channel, IceServerConfig, PeerId, RoomId};

/// Who gets asked before a joiner is let in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    #[default]
    AutoAccept,
    /// Room master surfaces `on_join_request` and only calls after approval.
    Gatekeeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomRole {
    /// Created the room; waits for join requests.
    Master,
    /// Broadcasts a join request once the relay reports connected.
    #[default]
    Member,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub room_id: RoomId,
    pub user_id: PeerId,
    pub channel: Channel,
    pub role: RoomRole,
    pub join_policy: JoinPolicy,
    /// Smaller user id keeps the caller role when both sides offer at once.
    pub tie_break: bool,
    pub data_channel_label: String,
}

impl ClientConfig {
    pub fn new(room_id: impl Into<RoomId>, user_id: impl Into<PeerId>) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_role(mut self, role: RoomRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_join_policy(mut self, policy: JoinPolicy) -> Self {
        self.join_policy = policy;
        self
    }

    pub fn with_tie_break(mut self, tie_break: bool) -> Self {
        self.tie_break = tie_break;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            room_id: RoomId::random(),
            user_id: PeerId::random(),
            channel: Channel::Data,
            role: RoomRole::Member,
            join_policy: JoinPolicy::AutoAccept,
            tie_break: false,
            data_channel_label: "chat".to_owned(),
        }
    }
}

/// Configuration for the webrtc-backed negotiable link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl LinkConfig {
    /// No ICE servers at all: host candidates only, enough for loopback tests.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::default()],
        }
    }
}
