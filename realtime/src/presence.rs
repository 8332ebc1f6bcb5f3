use crate::connection::UserId;
use crate::registry::ConnectionRegistry;
use std::sync::Arc;

/// Read-only view over the registry answering "who is online".
///
/// Answers are best-effort: a user whose connection died but has not been
/// evicted yet still reads as online. Delivery never depends on this.
#[derive(Debug, Clone)]
pub struct Presence {
    registry: Arc<ConnectionRegistry>,
}

impl Presence {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry
            .lookup(&user_id)
            .is_some_and(|connection| connection.is_alive())
    }

    pub fn online_count(&self) -> usize {
        self.registry
            .snapshot()
            .iter()
            .filter(|(_, connection)| connection.is_alive())
            .count()
    }

    /// Online user ids in ascending order. Agrees with [`Presence::is_online`].
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|(_, connection)| connection.is_alive())
            .map(|(user_id, _)| user_id)
            .collect();
        users.sort_unstable();
        users
    }
}
