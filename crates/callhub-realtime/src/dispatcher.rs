//! Inbound signal dispatch.

use std::sync::Arc;

use tracing::{debug, warn};

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::types::UserId;

use crate::call::manager::CallManager;
use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::payload::{
    CallAnswer, CallEndPayload, CallRequestPayload, CallResponsePayload, JoinRoomPayload,
    parse_payload,
};
use crate::message::serializer::{DecodeError, decode_inbound};
use crate::message::types::{SignalKind, SignalMessage};
use crate::message::validator::validate_inbound;
use crate::metrics::{RealtimeMetrics, messages};
use crate::presence::tracker::PresenceTracker;
use crate::room::manager::RoomManager;
use crate::room::room::Participant;

/// Routes decoded client messages to rooms, calls, and presence.
///
/// Every failure is reported to the sending connection as an `error`
/// signal; none of them ends the connection.
#[derive(Debug)]
pub struct SignalDispatcher {
    /// Delivery primitive.
    registry: Arc<ConnectionRegistry>,
    /// Room manager.
    rooms: Arc<RoomManager>,
    /// Call state machine.
    calls: Arc<CallManager>,
    /// Presence tracker.
    presence: Arc<PresenceTracker>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Largest accepted text frame.
    max_message_size: usize,
}

impl SignalDispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        calls: Arc<CallManager>,
        presence: Arc<PresenceTracker>,
        metrics: Arc<RealtimeMetrics>,
        max_message_size: usize,
    ) -> Self {
        Self {
            registry,
            rooms,
            calls,
            presence,
            metrics,
            max_message_size,
        }
    }

    /// Validates, decodes, and dispatches one text frame.
    pub async fn handle_text(&self, handle: &Arc<ConnectionHandle>, text: &str) {
        messages::record_received(&self.metrics);

        let decoded = validate_inbound(text, self.max_message_size).and_then(|()| decode_inbound(text));
        let msg = match decoded {
            Ok(msg) => msg.decorate(handle.user_id),
            Err(e) => {
                self.reject(handle, &e);
                return;
            }
        };

        let kind = msg.kind;
        if let Err(e) = self.dispatch(handle, msg).await {
            debug!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                kind = %kind,
                error = %e,
                "Signal rejected"
            );
            self.registry
                .send_to_connection(&handle.id, builder::build_app_error(&e));
        }
    }

    /// Reports an undecodable frame to its sender.
    pub fn reject(&self, handle: &ConnectionHandle, err: &DecodeError) {
        messages::record_protocol_error(&self.metrics);
        warn!(conn_id = %handle.id, code = err.code(), error = %err, "Malformed inbound frame");
        self.registry
            .send_to_connection(&handle.id, builder::build_decode_error(err));
    }

    /// Dispatches a decoded message whose sender has been stamped.
    pub async fn dispatch(&self, handle: &Arc<ConnectionHandle>, msg: SignalMessage) -> AppResult<()> {
        let participant = Participant::from(handle.as_ref());

        match msg.kind {
            SignalKind::Heartbeat => {
                self.presence
                    .heartbeat(handle.user_id, Some(handle.id))
                    .await;
                self.registry
                    .send_to_connection(&handle.id, builder::build_heartbeat_ack());
            }
            SignalKind::JoinRoom => {
                let room_id = msg
                    .room_id
                    .ok_or_else(|| AppError::validation("join_room requires room_id"))?;
                let body: JoinRoomPayload = parse_payload(msg.kind, &msg.payload)?;
                self.calls
                    .join_room(participant, room_id, body.room_type)
                    .await?;
            }
            SignalKind::LeaveRoom => {
                if self.calls.leave(participant).await.is_none() {
                    return Err(AppError::precondition("Not in a room"));
                }
            }
            SignalKind::CallRequest => {
                let callee = msg
                    .to
                    .ok_or_else(|| AppError::validation("call_request requires 'to'"))?;
                let body: CallRequestPayload = parse_payload(msg.kind, &msg.payload)?;
                let call = self
                    .calls
                    .request_call(participant, callee, body.call_type)
                    .await?;
                // Echo so the caller learns the call id.
                self.registry.send_to_connection(
                    &handle.id,
                    builder::build_incoming_call(&call, callee),
                );
            }
            SignalKind::CallResponse => {
                let body: CallResponsePayload = parse_payload(msg.kind, &msg.payload)?;
                match body.response {
                    CallAnswer::Accept => {
                        self.calls.accept(participant, body.call_id).await?;
                    }
                    CallAnswer::Decline => {
                        self.calls.decline(handle.user_id, body.call_id).await?;
                    }
                }
            }
            SignalKind::CallEnd => {
                let body: CallEndPayload = parse_payload(msg.kind, &msg.payload)?;
                self.calls.end(handle.user_id, body.call_id).await?;
            }
            kind if kind.is_relay() => self.relay(handle, msg).await?,
            kind => {
                return Err(AppError::protocol(format!(
                    "'{kind}' messages are sent by the server only"
                )));
            }
        }

        Ok(())
    }

    /// Forwards an opaque negotiation message.
    ///
    /// Routed to `to` when the sender shares a room or a live call with
    /// that user, otherwise broadcast to `room_id` (sender excluded)
    /// provided the sender is a member.
    async fn relay(&self, handle: &ConnectionHandle, msg: SignalMessage) -> AppResult<()> {
        if let Some(target) = msg.to {
            if !self.shares_session(handle, target).await {
                return Err(AppError::authorization(format!(
                    "No shared room or call with user {target}"
                )));
            }
            if !self.registry.send_to_user(&target, msg) {
                return Err(AppError::not_found(format!("User {target} is not connected")));
            }
            return Ok(());
        }

        let room_id = msg
            .room_id
            .ok_or_else(|| AppError::validation(format!("{} requires 'to' or room_id", msg.kind)))?;
        if !self.rooms.is_member(&room_id, handle.user_id).await {
            return Err(AppError::authorization(format!(
                "Not a member of room {room_id}"
            )));
        }
        self.rooms
            .broadcast(&room_id, &msg, Some(handle.user_id))
            .await;
        Ok(())
    }

    async fn shares_session(&self, handle: &ConnectionHandle, target: UserId) -> bool {
        if let Some(room_id) = self.rooms.room_of(&handle.id).await {
            if self.rooms.is_member(&room_id, target).await {
                return true;
            }
        }
        self.calls
            .active_call_for(handle.user_id)
            .await
            .is_some_and(|call| call.is_authorized(target))
    }
}
