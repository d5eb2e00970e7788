//! Signaling envelope and transport frame definitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use callhub_core::types::{RoomId, UserId};

/// Kind of a signaling message. Serialized in `snake_case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Server greeting after registration.
    Connected,
    /// Join (or create) a room.
    JoinRoom,
    /// Leave the current room.
    LeaveRoom,
    /// Start a call, or ring the callee.
    CallRequest,
    /// Accept or decline a ringing call.
    CallResponse,
    /// SDP offer relay.
    Offer,
    /// SDP answer relay.
    Answer,
    /// ICE candidate relay.
    IceCandidate,
    /// End a call.
    CallEnd,
    /// Client liveness ping.
    Heartbeat,
    /// Reply to a heartbeat.
    HeartbeatAck,
    /// Another participant joined the room.
    UserJoined,
    /// Another participant left the room.
    UserLeft,
    /// A friend went online or offline.
    Presence,
    /// Request failure report.
    Error,
}

impl SignalKind {
    /// Every kind, in declaration order.
    pub const ALL: [SignalKind; 15] = [
        Self::Connected,
        Self::JoinRoom,
        Self::LeaveRoom,
        Self::CallRequest,
        Self::CallResponse,
        Self::Offer,
        Self::Answer,
        Self::IceCandidate,
        Self::CallEnd,
        Self::Heartbeat,
        Self::HeartbeatAck,
        Self::UserJoined,
        Self::UserLeft,
        Self::Presence,
        Self::Error,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::CallRequest => "call_request",
            Self::CallResponse => "call_response",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice_candidate",
            Self::CallEnd => "call_end",
            Self::Heartbeat => "heartbeat",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::Presence => "presence",
            Self::Error => "error",
        }
    }

    /// Opaque WebRTC negotiation relays.
    pub fn is_relay(&self) -> bool {
        matches!(self, Self::Offer | Self::Answer | Self::IceCandidate)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Envelope used in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Message kind.
    pub kind: SignalKind,
    /// Sender. Always overwritten by the server for inbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// Target user for directed messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
    /// Room the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Kind-specific body.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Server timestamp.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl SignalMessage {
    /// Create a message of the given kind with an empty payload.
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            room_id: None,
            payload: Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Set the sender.
    pub fn from_user(mut self, user_id: UserId) -> Self {
        self.from = Some(user_id);
        self
    }

    /// Set the target user.
    pub fn to_user(mut self, user_id: UserId) -> Self {
        self.to = Some(user_id);
        self
    }

    /// Set the room.
    pub fn in_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Stamp the sender identity and server time on an inbound message.
    pub fn decorate(mut self, sender: UserId) -> Self {
        self.from = Some(sender);
        self.timestamp = Utc::now();
        self
    }
}

/// A transport-level frame.
///
/// The connection loops are written against streams and sinks of frames so
/// the same code drives WebSockets in production and in-process channels
/// in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text carrying one JSON envelope.
    Text(String),
    /// Binary data (not part of the protocol).
    Binary(Vec<u8>),
    /// Liveness probe.
    Ping(Vec<u8>),
    /// Probe answer.
    Pong(Vec<u8>),
    /// Orderly close.
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_match_serde() {
        for kind in SignalKind::ALL {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json, Value::String(kind.as_str().to_string()));
            assert_eq!(kind.as_str().parse::<SignalKind>(), Ok(kind));
        }
        assert!("subscribe".parse::<SignalKind>().is_err());
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let msg = SignalMessage::new(SignalKind::HeartbeatAck);
        let json = serde_json::to_value(&msg).expect("serialize");
        let object = json.as_object().expect("object");
        assert!(object.contains_key("kind"));
        assert!(object.contains_key("timestamp"));
        assert!(!object.contains_key("from"));
        assert!(!object.contains_key("payload"));
    }

    #[test]
    fn test_decorate_overwrites_sender() {
        let spoofed = UserId::new();
        let real = UserId::new();
        let msg = SignalMessage::new(SignalKind::Offer)
            .from_user(spoofed)
            .decorate(real);
        assert_eq!(msg.from, Some(real));
    }
}
