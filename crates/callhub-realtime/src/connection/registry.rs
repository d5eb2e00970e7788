//! Connection registry: registration, teardown, and per-user delivery.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use callhub_core::config::RealtimeConfig;
use callhub_core::types::{AuthenticatedUser, ConnectionId, UserId};

use crate::message::types::SignalMessage;
use crate::metrics::{RealtimeMetrics, connections, messages};

use super::events::ConnectionEvent;
use super::handle::{ConnectionHandle, ConnectionInfo, SendError};
use super::pool::ConnectionPool;

/// Owns every live connection and the single-session-per-user rule.
///
/// `unregister` is the only teardown primitive. It is idempotent and safe
/// to call concurrently from the read loop, the write loop, a failed
/// delivery, or a replacing registration.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connection pool.
    pool: ConnectionPool,
    /// Outbound queue capacity per connection.
    queue_size: usize,
    /// Lifecycle event publisher.
    events: mpsc::UnboundedSender<ConnectionEvent>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
}

impl ConnectionRegistry {
    /// Creates a registry and the receiver for its lifecycle events.
    pub fn new(
        config: &RealtimeConfig,
        metrics: Arc<RealtimeMetrics>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let registry = Self {
            pool: ConnectionPool::new(),
            queue_size: config.outbound_queue_size.max(1),
            events,
            metrics,
        };
        (registry, events_rx)
    }

    /// Registers a new authenticated connection.
    ///
    /// Any existing connection for the same user is force-closed. Returns
    /// the handle and the receiver the write loop drains.
    pub fn register(
        &self,
        user: &AuthenticatedUser,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<SignalMessage>) {
        let (tx, rx) = mpsc::channel(self.queue_size);
        let handle = Arc::new(ConnectionHandle::new(user, tx));

        if let Some(previous) = self.pool.add(handle.clone()) {
            info!(
                user_id = %user.user_id,
                old_conn_id = %previous,
                new_conn_id = %handle.id,
                "Replacing existing connection"
            );
            connections::record_replaced(&self.metrics);
            self.unregister(&previous);
        }

        connections::record_connect(&self.metrics);
        info!(
            conn_id = %handle.id,
            user_id = %user.user_id,
            username = %user.username,
            "Connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection.
    ///
    /// Returns `true` for the call that actually removed it; later calls
    /// are no-ops.
    pub fn unregister(&self, conn_id: &ConnectionId) -> bool {
        let Some((handle, released_user)) = self.pool.remove(conn_id) else {
            return false;
        };

        handle.close();
        connections::record_disconnect(&self.metrics);

        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id,
            released_user,
            "Connection unregistered"
        );

        let event = ConnectionEvent::Closed {
            connection_id: handle.id,
            user_id: handle.user_id,
            released_user,
        };
        if self.events.send(event).is_err() {
            debug!(conn_id = %conn_id, "Connection event receiver dropped");
        }

        true
    }

    /// Closes the current connection of a user, if any.
    pub fn close_user(&self, user_id: &UserId) -> bool {
        match self.pool.get_for_user(user_id) {
            Some(handle) => self.unregister(&handle.id),
            None => false,
        }
    }

    /// Queues a message on the user's connection.
    ///
    /// Returns `false` if the user has no live connection or the queue was
    /// full, in which case the connection is torn down.
    pub fn send_to_user(&self, user_id: &UserId, msg: SignalMessage) -> bool {
        match self.pool.get_for_user(user_id) {
            Some(handle) => self.deliver(&handle, msg),
            None => {
                messages::record_undeliverable(&self.metrics);
                debug!(user_id = %user_id, kind = %msg.kind, "User has no live connection");
                false
            }
        }
    }

    /// Queues a message on a specific connection, with the same
    /// backpressure rule as [`send_to_user`](Self::send_to_user).
    pub fn send_to_connection(&self, conn_id: &ConnectionId, msg: SignalMessage) -> bool {
        match self.pool.get(conn_id) {
            Some(handle) => self.deliver(&handle, msg),
            None => {
                messages::record_undeliverable(&self.metrics);
                false
            }
        }
    }

    fn deliver(&self, handle: &Arc<ConnectionHandle>, msg: SignalMessage) -> bool {
        match handle.send(msg) {
            Ok(()) => {
                messages::record_sent(&self.metrics);
                true
            }
            Err(SendError::Full) => {
                warn!(
                    conn_id = %handle.id,
                    user_id = %handle.user_id,
                    "Outbound queue full, disconnecting slow consumer"
                );
                connections::record_backpressure(&self.metrics);
                self.unregister(&handle.id);
                false
            }
            Err(SendError::Closed) => {
                debug!(conn_id = %handle.id, "Send on closed connection");
                self.unregister(&handle.id);
                false
            }
        }
    }

    /// Gets a live connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Gets the current connection of a user.
    pub fn connection_for_user(&self, user_id: &UserId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get_for_user(user_id)
    }

    /// Checks if a user currently has a live connection.
    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.pool.get_for_user(user_id).is_some()
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Snapshot of every live connection.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.pool
            .all_connections()
            .iter()
            .map(|handle| handle.info())
            .collect()
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }
}
