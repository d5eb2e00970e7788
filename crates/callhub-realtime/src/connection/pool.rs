//! Connection pool: every live connection, indexed by id and by user.

use std::sync::Arc;

use dashmap::DashMap;

use callhub_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of live connections.
///
/// A user maps to at most one connection; the user index is a lookup-only
/// back reference into `by_id`.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Connection ID → connection handle.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// User ID → the user's current connection.
    by_user: DashMap<UserId, ConnectionId>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection and makes it the user's current one.
    ///
    /// Returns the connection it displaced, if any.
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> Option<ConnectionId> {
        self.by_id.insert(handle.id, handle.clone());
        self.by_user
            .insert(handle.user_id, handle.id)
            .filter(|previous| *previous != handle.id)
    }

    /// Removes a connection.
    ///
    /// The user index entry is released only if it still points at this
    /// connection. Returns the handle and whether the entry was released,
    /// or `None` if the connection was already gone.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<(Arc<ConnectionHandle>, bool)> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        let released = self
            .by_user
            .remove_if(&handle.user_id, |_, current| current == conn_id)
            .is_some();
        Some((handle, released))
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Gets the current connection of a user.
    pub fn get_for_user(&self, user_id: &UserId) -> Option<Arc<ConnectionHandle>> {
        let conn_id = *self.by_user.get(user_id)?.value();
        self.get(&conn_id)
    }

    /// Returns total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of users with a live connection.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callhub_core::types::{AuthenticatedUser, UserRole};
    use tokio::sync::mpsc;

    fn handle(user_id: UserId) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        let user = AuthenticatedUser {
            user_id,
            username: "bob".to_string(),
            role: UserRole::User,
        };
        Arc::new(ConnectionHandle::new(&user, tx))
    }

    #[test]
    fn test_add_displaces_previous_connection() {
        let pool = ConnectionPool::new();
        let user_id = UserId::new();
        let first = handle(user_id);
        let second = handle(user_id);

        assert_eq!(pool.add(first.clone()), None);
        assert_eq!(pool.add(second.clone()), Some(first.id));
        assert_eq!(pool.get_for_user(&user_id).map(|h| h.id), Some(second.id));
    }

    #[test]
    fn test_remove_keeps_newer_user_entry() {
        let pool = ConnectionPool::new();
        let user_id = UserId::new();
        let first = handle(user_id);
        let second = handle(user_id);
        pool.add(first.clone());
        pool.add(second.clone());

        let (_, released) = pool.remove(&first.id).expect("present");
        assert!(!released);
        assert_eq!(pool.user_count(), 1);

        let (_, released) = pool.remove(&second.id).expect("present");
        assert!(released);
        assert!(pool.remove(&second.id).is_none());
        assert_eq!(pool.connection_count(), 0);
    }
}
