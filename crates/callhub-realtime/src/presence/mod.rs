//! Heartbeat-driven presence tracking.

pub mod entry;
pub mod listener;
pub mod sweeper;
pub mod tracker;

pub use entry::PresenceEntry;
pub use listener::{FriendPresenceNotifier, PresenceChange, PresenceListener};
pub use tracker::PresenceTracker;
