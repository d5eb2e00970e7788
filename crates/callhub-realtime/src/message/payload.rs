//! Typed payload bodies carried inside [`SignalMessage`](super::SignalMessage).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::types::{CallId, CallType, ConnectionId, UserId};

use super::types::SignalKind;

/// Client `call_request` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallRequestPayload {
    /// Requested media type.
    #[serde(default)]
    pub call_type: CallType,
}

/// Server `call_request` body delivered to the callee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingCallPayload {
    /// Call identifier.
    pub call_id: CallId,
    /// Media type.
    pub call_type: CallType,
    /// Caller.
    pub caller_id: UserId,
}

/// Answer to a ringing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallAnswer {
    /// Pick up.
    Accept,
    /// Reject.
    Decline,
}

/// `call_response` body in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponsePayload {
    /// Call identifier.
    pub call_id: CallId,
    /// The answer.
    pub response: CallAnswer,
}

/// Client `call_end` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndPayload {
    /// Call identifier.
    pub call_id: CallId,
}

/// Why a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// A participant hung up.
    Ended,
    /// Nobody answered before the ring timeout.
    Missed,
}

/// Server `call_end` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndedPayload {
    /// Call identifier.
    pub call_id: CallId,
    /// Why the call ended.
    pub reason: EndReason,
    /// Talk time, when the call was answered.
    pub duration_seconds: Option<i64>,
}

/// Client `join_room` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRoomPayload {
    /// Media type of the room when it has to be created.
    #[serde(default)]
    pub room_type: CallType,
}

/// `error` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// `connected` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// Identifier of the new connection.
    pub connection_id: ConnectionId,
    /// Authenticated user.
    pub user_id: UserId,
}

/// `presence` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Whether the subject is now online.
    pub online: bool,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

/// Parse a message payload, treating a missing payload as an empty object.
pub fn parse_payload<T: DeserializeOwned>(kind: SignalKind, payload: &Value) -> AppResult<T> {
    let value = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload.clone()
    };
    serde_json::from_value(value)
        .map_err(|e| AppError::validation(format!("Invalid {kind} payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_payload_uses_defaults() {
        let parsed: CallRequestPayload =
            parse_payload(SignalKind::CallRequest, &Value::Null).expect("defaults");
        assert_eq!(parsed.call_type, CallType::Video);
    }

    #[test]
    fn test_required_fields_are_enforced() {
        let err = parse_payload::<CallResponsePayload>(
            SignalKind::CallResponse,
            &json!({ "response": "accept" }),
        )
        .expect_err("call_id missing");
        assert!(err.message.contains("call_response"));
    }

    #[test]
    fn test_call_response_shape() {
        let call_id = CallId::new();
        let parsed: CallResponsePayload = parse_payload(
            SignalKind::CallResponse,
            &json!({ "call_id": call_id, "response": "decline" }),
        )
        .expect("parse");
        assert_eq!(parsed.call_id, call_id);
        assert_eq!(parsed.response, CallAnswer::Decline);
    }
}
