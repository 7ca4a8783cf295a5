mod channel;
mod envelope;
mod ice;
mod negotiation;
mod payload;
mod peer;
mod room;

pub use channel::Channel;
pub use envelope::{RelayFrame, SignalEnvelope, StatusFrame};
pub use ice::{DEFAULT_STUN_ADDR, IceServerConfig};
pub use negotiation::{IceCandidate, NegotiationMessage, SdpType, SessionDescription, SignalType};
pub use payload::Payload;
pub use peer::PeerId;
pub use room::RoomId;
