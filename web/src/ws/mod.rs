//! WebSocket transport for live connections.

pub(crate) mod handler;
