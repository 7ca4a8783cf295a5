use serde::{Deserialize, Serialize};

/// Tag separating negotiation flows multiplexed over one relay connection.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Channel {
    #[serde(rename = "dt")]
    Data,
    #[serde(rename = "md")]
    Media,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Data, Channel::Media];

    /// Control token a joining participant broadcasts on this flow.
    pub fn join_token(self) -> &'static str {
        match self {
            Channel::Data => "839d6af5-be15-474d-81c8-f34200007d4c",
            Channel::Media => "493aaf25-eea6-4f37-8f9f-eb4507811721",
        }
    }

    pub fn from_join_token(token: &str) -> Option<Channel> {
        Self::ALL.into_iter().find(|c| c.join_token() == token)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Channel::Data => "dt",
            Channel::Media => "md",
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::Data
    }
}
