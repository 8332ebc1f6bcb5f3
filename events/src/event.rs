use crate::kind::EventKind;
use crate::notification::NotificationJob;
use crate::Id;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::fmt;

/// Who an event is addressed to. Exactly one of the two shapes, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Deliver to exactly one user.
    Direct { target: Id },
    /// Deliver to every connected user except the originator.
    Broadcast { originator: Id },
}

/// An immutable event ready to be routed.
///
/// Producers build these with [`Event::direct`] or [`Event::broadcast`], which
/// makes an ill-shaped event unrepresentable. Raw submissions go through
/// `TryFrom<EventSubmission>` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    audience: Audience,
    payload: Value,
    fallback: Option<NotificationJob>,
}

impl Event {
    pub fn direct(kind: EventKind, target: Id, payload: Value) -> Self {
        Self {
            kind,
            audience: Audience::Direct { target },
            payload,
            fallback: None,
        }
    }

    pub fn broadcast(kind: EventKind, originator: Id, payload: Value) -> Self {
        Self {
            kind,
            audience: Audience::Broadcast { originator },
            payload,
            fallback: None,
        }
    }

    /// Attach the job to hand to the fallback gateway if a direct recipient
    /// is unreachable. Ignored for broadcast events.
    pub fn with_fallback(mut self, job: NotificationJob) -> Self {
        self.fallback = Some(job);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn audience(&self) -> Audience {
        self.audience
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn fallback(&self) -> Option<&NotificationJob> {
        self.fallback.as_ref()
    }
}

/// The raw shape producers submit over HTTP before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    pub kind: String,
    #[serde(default)]
    pub target_id: Option<Id>,
    #[serde(default)]
    pub originator_id: Option<Id>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub fallback: Option<NotificationJob>,
}

/// A submission that cannot be turned into an [`Event`]. Always a producer bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidEventShape {
    /// Neither `targetId` nor `originatorId` was supplied.
    MissingAudience,
    /// Both `targetId` and `originatorId` were supplied.
    AmbiguousAudience,
    /// `kind` is not part of the closed kind set.
    UnknownKind(String),
}

impl fmt::Display for InvalidEventShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidEventShape::MissingAudience => {
                write!(f, "event must carry either targetId or originatorId")
            }
            InvalidEventShape::AmbiguousAudience => {
                write!(f, "event must not carry both targetId and originatorId")
            }
            InvalidEventShape::UnknownKind(kind) => write!(f, "unknown event kind '{kind}'"),
        }
    }
}

impl StdError for InvalidEventShape {}

impl TryFrom<EventSubmission> for Event {
    type Error = InvalidEventShape;

    fn try_from(submission: EventSubmission) -> Result<Self, Self::Error> {
        let kind = submission
            .kind
            .parse::<EventKind>()
            .map_err(|unknown| InvalidEventShape::UnknownKind(unknown.0))?;

        let event = match (submission.target_id, submission.originator_id) {
            (Some(target), None) => Event::direct(kind, target, submission.payload),
            (None, Some(originator)) => Event::broadcast(kind, originator, submission.payload),
            (Some(_), Some(_)) => return Err(InvalidEventShape::AmbiguousAudience),
            (None, None) => return Err(InvalidEventShape::MissingAudience),
        };

        Ok(match submission.fallback {
            Some(job) => event.with_fallback(job),
            None => event,
        })
    }
}

/// Wrap a body in the `{action, body}` envelope clients switch on.
pub fn envelope(kind: EventKind, body: Value) -> Value {
    json!({
        "action": kind.as_str(),
        "body": body,
    })
}
