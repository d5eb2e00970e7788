//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callhub_core::types::UserId;
use callhub_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Presence of a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// User ID.
    pub user_id: UserId,
    /// Whether the user is currently online.
    pub online: bool,
    /// Last time the user was seen, if tracked.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Online friends of the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineFriendsResponse {
    /// Friend IDs currently online.
    pub online_friends: Vec<UserId>,
}

/// Engine statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeStatsResponse {
    /// Live connections.
    pub total_connections: usize,
    /// Rooms currently alive.
    pub active_rooms: usize,
    /// Users with a live connection.
    pub connected_users: usize,
    /// Users whose heartbeat is fresh.
    pub online_users: usize,
    /// Ringing or ongoing calls.
    pub live_calls: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

/// Result of an admin force-offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceOfflineResponse {
    /// User ID.
    pub user_id: UserId,
    /// Whether the user was online or connected before the call.
    pub was_online: bool,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Live connections.
    pub connections: usize,
}
