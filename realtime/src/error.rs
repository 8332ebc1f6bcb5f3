//! Error types for the `realtime` crate.
//!
//! Follows the same pattern as the other crates with a root Error struct and error kind enums.
//! Delivery failures are not errors here: they are reported as `DeliveryOutcome`s and
//! contained inside the dispatcher. Only problems the caller must fix surface as `Error`.
use crate::lifecycle::TransitionError;
use events::InvalidEventShape;
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: RealtimeErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum RealtimeErrorKind {
    /// The producer handed over an event that cannot be routed.
    InvalidEventShape(InvalidEventShape),
    /// An inbound client frame could not be understood.
    MalformedClientMessage,
    /// A connection was driven through an illegal lifecycle transition.
    Lifecycle,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            RealtimeErrorKind::InvalidEventShape(shape) => write!(f, "Invalid event: {shape}"),
            RealtimeErrorKind::MalformedClientMessage => match &self.source {
                Some(source) => write!(f, "Malformed client message: {source}"),
                None => write!(f, "Malformed client message"),
            },
            RealtimeErrorKind::Lifecycle => write!(f, "Realtime Error: {self:?}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<InvalidEventShape> for Error {
    fn from(err: InvalidEventShape) -> Self {
        Error {
            source: Some(Box::new(err.clone())),
            error_kind: RealtimeErrorKind::InvalidEventShape(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: RealtimeErrorKind::MalformedClientMessage,
        }
    }
}

impl From<TransitionError> for Error {
    fn from(err: TransitionError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: RealtimeErrorKind::Lifecycle,
        }
    }
}
