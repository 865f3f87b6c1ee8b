//! Registry of connections on the broadcast channel.
//!
//! The lock is only ever held for the duration of a map operation, never
//! across an `.await`, so enumeration hands out a snapshot that later
//! add/remove calls cannot disturb.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::connection::Connection;

/// Thread-safe set of currently open broadcast connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Map from connection ID to its outbound handle.
    connections: RwLock<HashMap<u64, Connection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection.
    pub fn add(&self, connection: Connection) {
        self.write().insert(connection.id(), connection);
    }

    /// Removes a connection. Unknown IDs are ignored.
    ///
    /// Returns true if the connection was present.
    pub fn remove(&self, connection_id: u64) -> bool {
        self.write().remove(&connection_id).is_some()
    }

    /// Returns a point-in-time snapshot of all registered connections.
    #[must_use]
    pub fn all(&self) -> Vec<Connection> {
        self.read().values().cloned().collect()
    }

    /// Returns true if the connection is registered.
    #[must_use]
    pub fn contains(&self, connection_id: u64) -> bool {
        self.read().contains_key(&connection_id)
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes every connection, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut connections = self.write();
        let count = connections.len();
        connections.clear();
        count
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, Connection>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, Connection>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
