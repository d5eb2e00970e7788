//! Room model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callhub_core::types::{CallId, CallType, ConnectionId, RoomId, UserId};

use crate::connection::handle::ConnectionHandle;

/// A user in a room, through one specific connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    /// The member.
    pub user_id: UserId,
    /// The connection that joined.
    pub connection_id: ConnectionId,
}

impl From<&ConnectionHandle> for Participant {
    fn from(handle: &ConnectionHandle) -> Self {
        Self {
            user_id: handle.user_id,
            connection_id: handle.id,
        }
    }
}

/// Room lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Only one participant so far.
    Waiting,
    /// At least two participants have joined.
    Active,
}

/// An ephemeral room. Never stored with zero members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Call carried by this room, if any.
    pub call_id: Option<CallId>,
    /// Media type.
    pub room_type: CallType,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Members in join order.
    pub members: Vec<Participant>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
    /// Capacity.
    pub max_participants: usize,
}

impl Room {
    /// Create an empty waiting room.
    pub fn new(
        id: RoomId,
        room_type: CallType,
        call_id: Option<CallId>,
        max_participants: usize,
    ) -> Self {
        Self {
            id,
            call_id,
            room_type,
            status: RoomStatus::Waiting,
            members: Vec::new(),
            created_at: Utc::now(),
            max_participants,
        }
    }

    /// Member user ids in join order.
    pub fn participant_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    /// Check whether a user is a member.
    pub fn has_user(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// Check whether the room is at capacity.
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_participants
    }

    /// Member user ids except `user_id`.
    pub(crate) fn others(&self, user_id: UserId) -> Vec<UserId> {
        self.members
            .iter()
            .map(|m| m.user_id)
            .filter(|id| *id != user_id)
            .collect()
    }
}
