mod behavior;
mod client;
mod config;
mod error;
pub mod link;
mod pending;
pub mod relay;
mod registry;
mod router;
mod session;

pub use behavior::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use pending::*;
pub use registry::*;
pub use router::{JoinDecision, MembershipProtocol};
pub use session::{SessionHandle, SessionInput, SessionState, SignalingRole};
