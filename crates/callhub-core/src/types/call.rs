//! Call record model shared by the signaling core and the call store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CallId, RoomId, UserId};
use crate::error::AppError;

/// Media type of a call (and of the room carrying it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Audio and video.
    #[default]
    Video,
    /// Audio only.
    Audio,
}

impl CallType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CallType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(AppError::validation(format!(
                "Invalid call type: '{s}'. Expected one of: video, audio"
            ))),
        }
    }
}

/// Lifecycle status of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Recorded but not yet delivered to the callee.
    Pending,
    /// Delivered to the callee, awaiting an answer.
    Ringing,
    /// Accepted and in progress.
    Ongoing,
    /// Finished normally.
    Ended,
    /// Rejected by the callee.
    Declined,
    /// Never answered.
    Missed,
}

impl CallStatus {
    /// Check if the call can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Declined | Self::Missed)
    }

    /// Check if the call occupies its participants (ringing or ongoing).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ringing | Self::Ongoing)
    }

    /// Check whether moving to `next` follows the lifecycle graph.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ringing)
                | (Self::Pending, Self::Ended)
                | (Self::Ringing, Self::Ongoing)
                | (Self::Ringing, Self::Declined)
                | (Self::Ringing, Self::Missed)
                | (Self::Ringing, Self::Ended)
                | (Self::Ongoing, Self::Missed)
                | (Self::Ongoing, Self::Ended)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ringing => "ringing",
            Self::Ongoing => "ongoing",
            Self::Ended => "ended",
            Self::Declined => "declined",
            Self::Missed => "missed",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "ringing" => Ok(Self::Ringing),
            "ongoing" => Ok(Self::Ongoing),
            "ended" => Ok(Self::Ended),
            "declined" => Ok(Self::Declined),
            "missed" => Ok(Self::Missed),
            _ => Err(AppError::validation(format!("Invalid call status: '{s}'"))),
        }
    }
}

/// A call between a caller and one or more participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique call identifier.
    pub id: CallId,
    /// User who placed the call.
    pub caller_id: UserId,
    /// Designated callee. `None` only for an unaccepted group invite.
    pub callee_id: Option<UserId>,
    /// Media type.
    pub call_type: CallType,
    /// Lifecycle status.
    pub status: CallStatus,
    /// Room carrying the call's signaling.
    pub room_id: RoomId,
    /// Everyone who took part, in join order (caller first).
    pub participants: Vec<UserId>,
    /// When the call was requested.
    pub created_at: DateTime<Utc>,
    /// When the callee accepted.
    pub started_at: Option<DateTime<Utc>>,
    /// When the call reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Seconds between `started_at` and `ended_at`.
    pub duration_seconds: Option<i64>,
}

impl CallRecord {
    /// Create a ringing one-to-one call with a fresh room.
    pub fn ringing(caller_id: UserId, callee_id: UserId, call_type: CallType) -> Self {
        Self {
            id: CallId::new(),
            caller_id,
            callee_id: Some(callee_id),
            call_type,
            status: CallStatus::Ringing,
            room_id: RoomId::new(),
            participants: vec![caller_id],
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            duration_seconds: None,
        }
    }

    /// Check whether `user_id` may query or act on this call.
    pub fn is_authorized(&self, user_id: UserId) -> bool {
        self.caller_id == user_id
            || self.callee_id == Some(user_id)
            || self.participants.contains(&user_id)
    }

    /// Everyone involved in the call except `user_id`.
    pub fn counterparts(&self, user_id: UserId) -> Vec<UserId> {
        let mut others: Vec<UserId> = Vec::with_capacity(self.participants.len() + 1);
        for id in std::iter::once(self.caller_id)
            .chain(self.callee_id)
            .chain(self.participants.iter().copied())
        {
            if id != user_id && !others.contains(&id) {
                others.push(id);
            }
        }
        others
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_accept_no_transition() {
        for status in [CallStatus::Ended, CallStatus::Declined, CallStatus::Missed] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(CallStatus::Ongoing));
            assert!(!status.can_transition_to(CallStatus::Ended));
        }
    }

    #[test]
    fn test_accept_only_from_ringing() {
        assert!(CallStatus::Ringing.can_transition_to(CallStatus::Ongoing));
        assert!(!CallStatus::Ongoing.can_transition_to(CallStatus::Ongoing));
        assert!(!CallStatus::Pending.can_transition_to(CallStatus::Ongoing));
        assert!(!CallStatus::Ongoing.can_transition_to(CallStatus::Declined));
    }

    #[test]
    fn test_counterparts_deduplicates() {
        let caller = UserId::new();
        let callee = UserId::new();
        let mut call = CallRecord::ringing(caller, callee, CallType::Audio);
        call.participants.push(callee);

        assert_eq!(call.counterparts(caller), vec![callee]);
        assert_eq!(call.counterparts(callee), vec![caller]);
        assert!(call.is_authorized(callee));
        assert!(!call.is_authorized(UserId::new()));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        let status: CallStatus = "Declined".parse().expect("parse");
        assert_eq!(status, CallStatus::Declined);
        assert_eq!(status.to_string(), "declined");
        assert!("ringing-ish".parse::<CallStatus>().is_err());
    }
}
