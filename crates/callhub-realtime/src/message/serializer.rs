//! JSON encoding and decoding of signaling envelopes.

use serde_json::Value;
use thiserror::Error;

use super::types::{SignalKind, SignalMessage};

/// Why an inbound frame could not be turned into a [`SignalMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not valid JSON, not an object, or fields of the wrong shape.
    #[error("{0}")]
    Malformed(String),
    /// Well-formed envelope with a kind the server does not know.
    #[error("Unknown message kind '{0}'")]
    UnknownKind(String),
}

impl DecodeError {
    /// Code carried in the resulting `error` signal.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "INVALID_MESSAGE",
            Self::UnknownKind(_) => "UNKNOWN_KIND",
        }
    }
}

/// Decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<SignalMessage, DecodeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::Malformed(format!("Failed to parse message: {e}")))?;

    let kind = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("Message must be a JSON object".to_string()))?
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Malformed("Message has no 'kind'".to_string()))?;

    if kind.parse::<SignalKind>().is_err() {
        return Err(DecodeError::UnknownKind(kind.to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| DecodeError::Malformed(format!("Invalid message fields: {e}")))
}

/// Encode an outbound message.
pub fn encode_outbound(msg: &SignalMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
