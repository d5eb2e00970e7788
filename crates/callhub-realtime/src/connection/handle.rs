//! Individual connection handle.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use callhub_core::types::{AuthenticatedUser, ConnectionId, UserId, UserRole};

use crate::message::types::SignalMessage;

/// Why a message could not be queued on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The connection has already been closed.
    Closed,
    /// The outbound queue is at capacity.
    Full,
}

/// A handle to a single live connection.
///
/// Holds the sender half of the bounded outbound queue drained by the
/// write loop, plus the identity established at authentication.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Username (cached for logging)
    pub username: String,
    /// User's role (cached for quick checks)
    pub role: UserRole,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound messages
    sender: mpsc::Sender<SignalMessage>,
    /// Cancelled once, when the connection is closed
    cancel: CancellationToken,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Last inbound frame, in milliseconds since the epoch
    last_activity_ms: AtomicI64,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user: &AuthenticatedUser, sender: mpsc::Sender<SignalMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::new(),
            user_id: user.user_id,
            username: user.username.clone(),
            role: user.role,
            connected_at: now,
            sender,
            cancel: CancellationToken::new(),
            alive: AtomicBool::new(true),
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    /// Queue an outbound message without waiting.
    pub fn send(&self, msg: SignalMessage) -> Result<(), SendError> {
        if !self.is_alive() {
            return Err(SendError::Closed);
        }
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SendError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection closed and wake both loops.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn close(&self) -> bool {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        self.cancel.cancel();
        was_alive
    }

    /// Resolves once the connection has been closed.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Last time a frame arrived on this connection
    pub fn last_activity(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_activity_ms.load(Ordering::Relaxed))
            .single()
            .unwrap_or(self.connected_at)
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role,
            connected_at: self.connected_at,
            last_activity: self.last_activity(),
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// User ID
    pub user_id: UserId,
    /// Username
    pub username: String,
    /// Role
    pub role: UserRole,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last activity
    pub last_activity: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::SignalKind;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: UserId::new(),
            username: "alice".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_send_reports_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(&user(), tx);

        assert_eq!(handle.send(SignalMessage::new(SignalKind::HeartbeatAck)), Ok(()));
        assert_eq!(
            handle.send(SignalMessage::new(SignalKind::HeartbeatAck)),
            Err(SendError::Full)
        );
    }

    #[tokio::test]
    async fn test_close_is_single_shot() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(&user(), tx);

        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.is_alive());
        handle.cancelled().await;
        assert_eq!(
            handle.send(SignalMessage::new(SignalKind::HeartbeatAck)),
            Err(SendError::Closed)
        );
    }
}
