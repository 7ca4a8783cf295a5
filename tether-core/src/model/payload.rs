use crate::codec::{Codec, CodecError};
use crate::model::channel::Channel;
use crate::model::negotiation::NegotiationMessage;

/// Classification of an envelope's `msg`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    JoinRequest(Channel),
    Negotiation(NegotiationMessage),
    /// Anything that is neither a join token nor a decodable negotiation message.
    Plain(String),
}

impl Payload {
    /// Never fails: undecodable text falls back to `Plain`.
    pub fn parse(raw: &str, codec: &dyn Codec) -> Self {
        if let Some(channel) = Channel::from_join_token(raw) {
            return Payload::JoinRequest(channel);
        }
        match codec.decode(raw) {
            Ok(msg) => Payload::Negotiation(msg),
            Err(_) => Payload::Plain(raw.to_owned()),
        }
    }

    pub fn encode(&self, codec: &dyn Codec) -> Result<String, CodecError> {
        match self {
            Payload::JoinRequest(channel) => Ok(channel.join_token().to_owned()),
            Payload::Negotiation(msg) => codec.encode(msg),
            Payload::Plain(text) => Ok(text.clone()),
        }
    }
}
