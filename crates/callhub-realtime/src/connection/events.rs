//! Lifecycle events published by the registry.

use callhub_core::types::{ConnectionId, UserId};

/// Published on the registry's event channel and consumed by the engine's
/// dispatch task, which performs teardown that needs other subsystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection was unregistered. Emitted exactly once per connection.
    Closed {
        /// The closed connection.
        connection_id: ConnectionId,
        /// Its owner.
        user_id: UserId,
        /// Whether the user index entry was released by this connection
        /// (false when a newer connection had already replaced it).
        released_user: bool,
    },
}
