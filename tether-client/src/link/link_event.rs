use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tether_core::IceCandidate;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Connection state as reported by the link engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl LinkState {
    /// States after which the link will not recover on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Failed | LinkState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

impl From<RTPCodecType> for TrackKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => TrackKind::Unknown,
        }
    }
}

/// Inbound media announced by the remote side.
#[derive(Clone)]
pub struct RemoteStream {
    pub stream_id: String,
    pub track_id: String,
    pub kind: TrackKind,
    /// Engine handle for reading RTP; absent for links that carry no real media.
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Events a link reports back to the session that owns it.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Trickle ICE: a local candidate to forward to the remote peer.
    LocalCandidate(IceCandidate),

    ChannelOpen(String),

    ChannelClosed(String),

    Message { label: String, data: Bytes },

    RemoteStream(RemoteStream),

    StateChanged(LinkState),
}
