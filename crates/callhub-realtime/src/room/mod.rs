//! Ephemeral rooms grouping the connections taking part in a call.

pub mod manager;
pub mod room;

pub use manager::{JoinOutcome, LeaveOutcome, RoomManager};
pub use room::{Participant, Room, RoomStatus};
