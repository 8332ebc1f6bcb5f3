//! Server-Sent Events transport for clients that only need to listen.
//!
//! Frames are the same ones WebSocket clients receive, delivered as the
//! `data` of each event.

pub(crate) mod handler;
