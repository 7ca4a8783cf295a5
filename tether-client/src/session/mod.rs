mod peer_session;
mod session_context;
mod session_handle;
mod session_state;

pub(crate) use peer_session::PeerSession;
pub(crate) use session_context::SessionContext;
pub use session_handle::{SessionHandle, SessionInput};
pub use session_state::{SessionState, SignalingRole};
