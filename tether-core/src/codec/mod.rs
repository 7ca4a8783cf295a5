use crate::model::NegotiationMessage;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a negotiation message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize negotiation message: {0}")]
    Encode(serde_json::Error),
}

/// Wire format of the negotiation payload embedded in `SignalEnvelope::msg`.
pub trait Codec: Send + Sync {
    fn encode(&self, msg: &NegotiationMessage) -> Result<String, CodecError>;

    fn decode(&self, raw: &str) -> Result<NegotiationMessage, CodecError>;
}

/// Base64 over JSON. Text that does not look like base64 is tried as bare JSON
/// so older peers sending unencoded payloads still negotiate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl Codec for Base64JsonCodec {
    fn encode(&self, msg: &NegotiationMessage) -> Result<String, CodecError> {
        let json = serde_json::to_vec(msg).map_err(CodecError::Encode)?;
        Ok(STANDARD.encode(json))
    }

    fn decode(&self, raw: &str) -> Result<NegotiationMessage, CodecError> {
        if !looks_like_base64(raw) {
            return Ok(serde_json::from_str(raw)?);
        }
        let bytes = STANDARD.decode(raw)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Shape check only: non-empty, length a multiple of 4, base64 alphabet plus padding.
pub fn looks_like_base64(s: &str) -> bool {
    if s.is_empty() || s.len() % 4 != 0 {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}
