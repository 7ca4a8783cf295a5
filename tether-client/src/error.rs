use tether_core::{CodecError, PeerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling router has shut down")]
    RouterClosed,

    #[error("session for peer {0} is closed")]
    SessionClosed(PeerId),

    #[error("relay error: {0}")]
    Relay(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("link error: {0}")]
    Link(#[from] anyhow::Error),
}
