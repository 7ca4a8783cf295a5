//! Peer-to-peer mesh signaling: a relay-driven negotiation core plus the relay itself.
//!
//! Enable `client` for the signaling core, `relay` for the WebSocket relay server.

pub use tether_core::{PeerId, RoomId};

pub mod model {
    pub use tether_core::model::*;
}

pub mod codec {
    pub use tether_core::codec::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tether_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tether_relay::*;
}
