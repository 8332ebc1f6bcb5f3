use crate::lifecycle::{ConnectionState, Lifecycle};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

// Type alias for user IDs, shared with event producers
pub type UserId = events::Id;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a frame could not be queued on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The outbound queue is at capacity; the consumer is not keeping up.
    Full,
    /// The receiving side is gone or the connection is tearing down.
    Closed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendError::Full => write!(f, "outbound queue full"),
            SendError::Closed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for SendError {}

/// One live duplex channel for a user.
///
/// The transport task that services the socket owns the receiving half of the
/// outbound queue and is the single writer to the peer, which keeps delivery
/// FIFO per connection. Everyone else holds an `Arc<Connection>` and can only
/// enqueue frames or ask the transport task to close.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    sender: mpsc::Sender<String>,
    created_at: DateTime<Utc>,
    lifecycle: Lifecycle,
    close_requested: AtomicBool,
    close_signal: Notify,
}

impl Connection {
    pub fn new(user_id: UserId, sender: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            sender,
            created_at: Utc::now(),
            lifecycle: Lifecycle::new(),
            close_requested: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    /// Builds a connection with a bounded outbound queue and returns the
    /// receiving half for the transport task.
    pub fn channel(user_id: UserId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(user_id, tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Whether frames can still be queued on this connection.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connecting | ConnectionState::Active
        ) && !self.close_requested.load(Ordering::Acquire)
            && !self.sender.is_closed()
    }

    /// Queue a frame without waiting. Never blocks on a slow consumer.
    pub fn send(&self, frame: String) -> Result<(), SendError> {
        if !self.is_alive() {
            return Err(SendError::Closed);
        }

        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Ask the transport task to shut the connection down. Idempotent.
    pub fn close(&self) {
        if !self.close_requested.swap(true, Ordering::AcqRel) {
            self.close_signal.notify_one();
        }
    }

    pub fn is_close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    /// Resolves once [`Connection::close`] has been called.
    pub async fn closed(&self) {
        if self.is_close_requested() {
            return;
        }
        self.close_signal.notified().await;
    }
}
