//! Event vocabulary shared by event producers and the real-time fan-out core.
//!
//! This crate provides the types that cross the boundary between the CRUD
//! handlers (which decide *what* happened and *who* should hear about it) and
//! the `realtime` crate (which decides *how* it reaches them).
//!
//! # Architecture
//!
//! - **EventKind**: The closed set of notification kinds, with their wire names
//! - **Event**: A validated, immutable event addressed to one user (direct) or
//!   to everyone but its originator (broadcast)
//! - **EventSubmission**: The raw, unvalidated shape accepted from producers
//!   that talk to the core over HTTP
//! - **NotificationJob**: The typed job handed to the fallback gateway when a
//!   direct recipient cannot be reached over a live connection
//! - **EventHandler** / **EventPublisher**: In-process producer seam
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies. Payloads are carried as `serde_json::Value` and are never
//! interpreted here.

use async_trait::async_trait;
use std::sync::Arc;

pub mod event;
pub mod kind;
pub mod notification;

pub use event::{envelope, Audience, Event, EventSubmission, InvalidEventShape};
pub use kind::EventKind;
pub use notification::{NotificationJob, NotificationPayload, Recipient};

/// A type alias that represents a user's identity.
/// This matches the integer primary key of the users table.
pub type Id = i64;

/// Trait for handling events emitted by producers.
/// Implementations perform side effects like pushing to live connections.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Publishes events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: Event) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
