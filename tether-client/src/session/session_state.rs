use std::fmt;

/// Negotiation progress of one pairwise link.
///
/// Caller: `New -> HaveLocalOffer -> Connected`.
/// Answerer: `New -> HaveRemoteOffer -> HaveLocalAnswer -> Connected`.
/// `Closed` is reachable from anywhere and is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalAnswer,
    Connected,
    Closed,
}

impl SessionState {
    pub fn accepts_offer(self) -> bool {
        !matches!(self, SessionState::Connected | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::New => "new",
            SessionState::HaveLocalOffer => "have-local-offer",
            SessionState::HaveRemoteOffer => "have-remote-offer",
            SessionState::HaveLocalAnswer => "have-local-answer",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalingRole {
    #[default]
    Unset,
    Offerer,
    Answerer,
}
