//! Builder helpers for constructing outbound signaling messages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use callhub_core::error::AppError;
use callhub_core::types::{CallRecord, ConnectionId, RoomId, UserId};

use super::payload::{
    CallAnswer, CallEndedPayload, CallResponsePayload, ConnectedPayload, EndReason, ErrorPayload,
    IncomingCallPayload, PresencePayload,
};
use super::serializer::DecodeError;
use super::types::{SignalKind, SignalMessage};

fn to_payload<T: Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}

/// Build the greeting sent right after registration
pub fn build_connected(connection_id: ConnectionId, user_id: UserId) -> SignalMessage {
    SignalMessage::new(SignalKind::Connected).with_payload(to_payload(&ConnectedPayload {
        connection_id,
        user_id,
    }))
}

/// Build an error message
pub fn build_error(code: &str, message: &str) -> SignalMessage {
    SignalMessage::new(SignalKind::Error).with_payload(to_payload(&ErrorPayload {
        code: code.to_string(),
        message: message.to_string(),
    }))
}

/// Build an error message from an application error
pub fn build_app_error(err: &AppError) -> SignalMessage {
    build_error(err.kind.signal_code(), &err.message)
}

/// Build an error message for an undecodable frame
pub fn build_decode_error(err: &DecodeError) -> SignalMessage {
    build_error(err.code(), &err.to_string())
}

/// Build a heartbeat acknowledgement
pub fn build_heartbeat_ack() -> SignalMessage {
    SignalMessage::new(SignalKind::HeartbeatAck)
}

/// Build a `user_joined` notice
pub fn build_user_joined(room_id: RoomId, user_id: UserId) -> SignalMessage {
    SignalMessage::new(SignalKind::UserJoined)
        .from_user(user_id)
        .in_room(room_id)
}

/// Build a `user_left` notice
pub fn build_user_left(room_id: RoomId, user_id: UserId) -> SignalMessage {
    SignalMessage::new(SignalKind::UserLeft)
        .from_user(user_id)
        .in_room(room_id)
}

/// Build the ring delivered to the callee
pub fn build_incoming_call(call: &CallRecord, callee_id: UserId) -> SignalMessage {
    SignalMessage::new(SignalKind::CallRequest)
        .from_user(call.caller_id)
        .to_user(callee_id)
        .in_room(call.room_id)
        .with_payload(to_payload(&IncomingCallPayload {
            call_id: call.id,
            call_type: call.call_type,
            caller_id: call.caller_id,
        }))
}

/// Build the callee's answer relayed to the caller
pub fn build_call_response(call: &CallRecord, responder: UserId, answer: CallAnswer) -> SignalMessage {
    SignalMessage::new(SignalKind::CallResponse)
        .from_user(responder)
        .to_user(call.caller_id)
        .in_room(call.room_id)
        .with_payload(to_payload(&CallResponsePayload {
            call_id: call.id,
            response: answer,
        }))
}

/// Build a `call_end` notice
pub fn build_call_end(call: &CallRecord, ended_by: Option<UserId>, reason: EndReason) -> SignalMessage {
    let mut msg = SignalMessage::new(SignalKind::CallEnd)
        .in_room(call.room_id)
        .with_payload(to_payload(&CallEndedPayload {
            call_id: call.id,
            reason,
            duration_seconds: call.duration_seconds,
        }));
    msg.from = ended_by;
    msg
}

/// Build a friend presence change
pub fn build_presence(user_id: UserId, online: bool, at: DateTime<Utc>) -> SignalMessage {
    SignalMessage::new(SignalKind::Presence)
        .from_user(user_id)
        .with_payload(to_payload(&PresencePayload { online, at }))
}
