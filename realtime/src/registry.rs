use crate::connection::{Connection, UserId};
use dashmap::DashMap;
use std::sync::Arc;

/// Registry of live connections, one per user (last writer wins).
///
/// Shard locks are held only while an entry is read or swapped; callers
/// get an `Arc<Connection>` clone back and do their I/O after the lock is
/// released.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Arc<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert or replace the entry for the connection's user - O(1)
    ///
    /// Returns the superseded connection, if any. It is NOT closed here.
    pub fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        self.connections.insert(connection.user_id(), connection)
    }

    /// Remove the entry only if it still holds this exact connection - O(1)
    ///
    /// A stale teardown of a superseded connection leaves the newer entry alone.
    pub fn deregister(&self, connection: &Connection) -> bool {
        self.connections
            .remove_if(&connection.user_id(), |_, current| {
                current.id() == connection.id()
            })
            .is_some()
    }

    pub fn lookup(&self, user_id: &UserId) -> Option<Arc<Connection>> {
        self.connections
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Point-in-time copy of every entry, for broadcast.
    ///
    /// Each user appears at most once. Registrations that race with the copy
    /// may or may not be included.
    pub fn snapshot(&self) -> Vec<(UserId, Arc<Connection>)> {
        self.connections
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
