//! One-way lifecycle of a single connection: `Connecting → Active → Closing → Closed`.
//!
//! The state lives in an atomic and only ever moves forward through
//! compare-and-swap, so racing teardowns agree on a single winner without a lock.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Authenticated upstream, not yet visible in the registry.
    Connecting = 0,
    /// Registered; may send and receive.
    Active = 1,
    /// Teardown in progress; no longer accepts outbound frames.
    Closing = 2,
    /// Terminal.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Active,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attempted transition that the current state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "illegal connection transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting as u8),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// `Connecting → Active`. Fails from every other state.
    pub fn activate(&self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Connecting, ConnectionState::Active)
    }

    /// Enters `Closing` from `Connecting` or `Active`.
    ///
    /// Returns `true` for exactly one caller; everyone else sees `false`.
    pub fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            match ConnectionState::from_u8(current) {
                ConnectionState::Connecting | ConnectionState::Active => {}
                ConnectionState::Closing | ConnectionState::Closed => return false,
            }
            match self.state.compare_exchange_weak(
                current,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// `Closing → Closed`.
    pub fn finish_close(&self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Closing, ConnectionState::Closed)
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> Result<(), TransitionError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|observed| TransitionError {
                from: ConnectionState::from_u8(observed),
                to,
            })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
