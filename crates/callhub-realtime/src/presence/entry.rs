//! Per-user presence entry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use callhub_core::types::{ConnectionId, UserId};

/// Live presence state of one user.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    /// The user.
    pub user_id: UserId,
    /// Connection that brought the user online, if known.
    pub connection_id: Option<ConnectionId>,
    /// When the entry was created.
    pub connected_at: DateTime<Utc>,
    /// Wall-clock time of the last heartbeat.
    pub last_seen: DateTime<Utc>,
    /// Monotonic time of the last heartbeat.
    pub last_heartbeat: Instant,
    /// Whether the user is actively connected.
    pub active: bool,
}

impl PresenceEntry {
    /// Create an entry stamped with the current time.
    pub fn new(user_id: UserId, connection_id: Option<ConnectionId>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            connection_id,
            connected_at: now,
            last_seen: now,
            last_heartbeat: Instant::now(),
            active: true,
        }
    }

    /// Record a heartbeat.
    pub fn refresh(&mut self) {
        self.last_seen = Utc::now();
        self.last_heartbeat = Instant::now();
        self.active = true;
    }

    /// Whether the last heartbeat is younger than `timeout` at `now`.
    pub fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) < timeout
    }
}
