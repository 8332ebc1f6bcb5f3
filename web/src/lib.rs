//! HTTP and WebSocket surface for the real-time core.
//!
//! - `GET /ws` and `GET /sse`: live connections for the identified user
//! - `POST /events`: producers submit events for routing
//! - `GET /presence`, `GET /presence/:user_id`: who is online
//! - `GET /health`
//!
//! Identity is established upstream; this layer trusts the `x-user-id`
//! header set by the auth proxy in front of it.

use realtime::Manager;
use service::config::Config;
use std::sync::Arc;

mod controller;
pub mod error;
mod extractors;
pub mod router;
mod sse;
mod ws;

pub use error::{Error, Result};

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub manager: Arc<Manager>,
}

impl AppState {
    pub fn new(config: Config, manager: Arc<Manager>) -> Self {
        Self { config, manager }
    }
}
