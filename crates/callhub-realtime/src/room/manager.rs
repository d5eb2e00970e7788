//! Room manager: membership changes and fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::types::{CallId, CallType, ConnectionId, RoomId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::types::SignalMessage;

use super::room::{Participant, Room, RoomStatus};

/// Result of a connection leaving its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Room that was left.
    pub room_id: RoomId,
    /// Call carried by the room, if any.
    pub call_id: Option<CallId>,
    /// Who left.
    pub participant: Participant,
    /// Members still in the room.
    pub remaining: usize,
    /// Whether the room was deleted because it became empty.
    pub room_deleted: bool,
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The room after the join.
    pub room: Room,
    /// The room the connection was in before, if it had to leave one.
    pub left: Option<LeaveOutcome>,
}

#[derive(Debug, Default)]
struct RoomState {
    /// Room ID → room.
    rooms: HashMap<RoomId, Room>,
    /// Connection ID → the room it is in (at most one).
    memberships: HashMap<ConnectionId, RoomId>,
}

impl RoomState {
    /// Remove a connection from its room, deleting the room if it empties.
    /// Returns the outcome and the members to notify.
    fn leave(&mut self, conn_id: &ConnectionId) -> Option<(LeaveOutcome, Vec<UserId>)> {
        let room_id = self.memberships.remove(conn_id)?;
        let room = self.rooms.get_mut(&room_id)?;

        let position = room
            .members
            .iter()
            .position(|m| m.connection_id == *conn_id)?;
        let participant = room.members.remove(position);
        let remaining = room.members.len();
        let call_id = room.call_id;
        let recipients = room.others(participant.user_id);

        let room_deleted = remaining == 0;
        if room_deleted {
            self.rooms.remove(&room_id);
        }

        Some((
            LeaveOutcome {
                room_id,
                call_id,
                participant,
                remaining,
                room_deleted,
            },
            recipients,
        ))
    }
}

/// Groups connections into ephemeral rooms and fans messages out to them.
///
/// All membership changes happen under one write lock; delivery happens
/// after the lock is released.
#[derive(Debug)]
pub struct RoomManager {
    /// Rooms and the connection → room index.
    state: RwLock<RoomState>,
    /// Delivery primitive.
    registry: Arc<ConnectionRegistry>,
    /// Capacity of newly created rooms.
    max_participants: usize,
}

impl RoomManager {
    /// Creates a new room manager.
    pub fn new(registry: Arc<ConnectionRegistry>, max_participants: usize) -> Self {
        Self {
            state: RwLock::new(RoomState::default()),
            registry,
            max_participants: max_participants.max(1),
        }
    }

    /// Joins a connection to a room, creating the room on first join.
    ///
    /// The connection first leaves any other room it is in. Existing
    /// members are told with `user_joined`; the joiner is not.
    pub async fn join_room(
        &self,
        participant: Participant,
        room_id: RoomId,
        room_type: CallType,
        call_id: Option<CallId>,
    ) -> AppResult<JoinOutcome> {
        let (room, left, recipients) = {
            let mut state = self.state.write().await;

            if state.memberships.get(&participant.connection_id) == Some(&room_id) {
                if let Some(room) = state.rooms.get(&room_id) {
                    return Ok(JoinOutcome {
                        room: room.clone(),
                        left: None,
                    });
                }
            }

            if let Some(room) = state.rooms.get(&room_id) {
                if room.is_full() && !room.has_user(participant.user_id) {
                    return Err(AppError::capacity(format!(
                        "Room {room_id} is full ({} participants)",
                        room.max_participants
                    )));
                }
            }

            let left = state.leave(&participant.connection_id);

            let RoomState { rooms, memberships } = &mut *state;
            let max_participants = self.max_participants;
            let room = rooms
                .entry(room_id)
                .or_insert_with(|| Room::new(room_id, room_type, call_id, max_participants));

            // A stale membership of the same user through an older connection.
            if let Some(position) = room
                .members
                .iter()
                .position(|m| m.user_id == participant.user_id)
            {
                let stale = room.members.remove(position);
                memberships.remove(&stale.connection_id);
            }

            room.members.push(participant);
            if room.members.len() >= 2 {
                room.status = RoomStatus::Active;
            }
            memberships.insert(participant.connection_id, room_id);

            (room.clone(), left, room.others(participant.user_id))
        };

        if let Some((outcome, left_recipients)) = &left {
            self.notify_left(outcome, left_recipients);
        }

        let notice = builder::build_user_joined(room_id, participant.user_id);
        for user_id in &recipients {
            self.registry.send_to_user(user_id, notice.clone());
        }

        debug!(
            room_id = %room_id,
            user_id = %participant.user_id,
            members = room.members.len(),
            "Joined room"
        );

        Ok(JoinOutcome {
            room,
            left: left.map(|(outcome, _)| outcome),
        })
    }

    /// Removes a connection from its current room.
    ///
    /// Remaining members are told with `user_left`; an emptied room is
    /// deleted. Returns `None` if the connection was in no room.
    pub async fn leave_room(&self, conn_id: &ConnectionId) -> Option<LeaveOutcome> {
        let (outcome, recipients) = self.state.write().await.leave(conn_id)?;
        self.notify_left(&outcome, &recipients);
        Some(outcome)
    }

    fn notify_left(&self, outcome: &LeaveOutcome, recipients: &[UserId]) {
        let notice = builder::build_user_left(outcome.room_id, outcome.participant.user_id);
        for user_id in recipients {
            self.registry.send_to_user(user_id, notice.clone());
        }
        debug!(
            room_id = %outcome.room_id,
            user_id = %outcome.participant.user_id,
            remaining = outcome.remaining,
            room_deleted = outcome.room_deleted,
            "Left room"
        );
    }

    /// Delivers a message to every member except `exclude`.
    ///
    /// Returns the number of successful deliveries. Individual failures do
    /// not abort the broadcast.
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        msg: &SignalMessage,
        exclude: Option<UserId>,
    ) -> usize {
        let recipients: Vec<UserId> = {
            let state = self.state.read().await;
            match state.rooms.get(room_id) {
                Some(room) => room
                    .members
                    .iter()
                    .map(|m| m.user_id)
                    .filter(|id| Some(*id) != exclude)
                    .collect(),
                None => return 0,
            }
        };

        recipients
            .iter()
            .filter(|user_id| self.registry.send_to_user(user_id, msg.clone()))
            .count()
    }

    /// Tears a room down, removing every membership.
    ///
    /// Returns the members that were removed.
    pub async fn close_room(&self, room_id: &RoomId) -> Vec<Participant> {
        let mut state = self.state.write().await;
        let Some(room) = state.rooms.remove(room_id) else {
            return Vec::new();
        };
        for member in &room.members {
            state.memberships.remove(&member.connection_id);
        }
        info!(room_id = %room_id, members = room.members.len(), "Room closed");
        room.members
    }

    /// Snapshot of a room.
    pub async fn room(&self, room_id: &RoomId) -> Option<Room> {
        self.state.read().await.rooms.get(room_id).cloned()
    }

    /// The room a connection is in.
    pub async fn room_of(&self, conn_id: &ConnectionId) -> Option<RoomId> {
        self.state.read().await.memberships.get(conn_id).copied()
    }

    /// The call carried by a room, if the room exists and carries one.
    pub async fn call_of(&self, room_id: &RoomId) -> Option<CallId> {
        self.state
            .read()
            .await
            .rooms
            .get(room_id)
            .and_then(|room| room.call_id)
    }

    /// Check whether a user is a member of a room.
    pub async fn is_member(&self, room_id: &RoomId, user_id: UserId) -> bool {
        self.state
            .read()
            .await
            .rooms
            .get(room_id)
            .is_some_and(|room| room.has_user(user_id))
    }

    /// Number of rooms currently alive.
    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }
}
