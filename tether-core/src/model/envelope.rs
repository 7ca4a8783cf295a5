use crate::model::channel::Channel;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Unit exchanged over the relay. `to == None` means broadcast to the room, excluding the sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    pub from: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PeerId>,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

impl SignalEnvelope {
    pub fn new(from: PeerId, msg: impl Into<String>) -> Self {
        Self {
            channel: None,
            from,
            to: None,
            msg: msg.into(),
            room_id: None,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_to(mut self, to: PeerId) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }
}

/// Status notice pushed by the relay itself, e.g. `{"status":200,"msg":"onConnected-2"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusFrame {
    pub status: u16,
    pub msg: String,
}

impl StatusFrame {
    pub const CONNECTED_PREFIX: &'static str = "onConnected";

    pub fn connected(member_count: usize) -> Self {
        Self {
            status: 200,
            msg: format!("{}-{}", Self::CONNECTED_PREFIX, member_count),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == 200 && self.msg.starts_with(Self::CONNECTED_PREFIX)
    }
}

/// Anything the relay can deliver down a participant's socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RelayFrame {
    Status(StatusFrame),
    Envelope(SignalEnvelope),
}
