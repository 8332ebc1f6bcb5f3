use crate::kind::EventKind;
use crate::Id;
use serde::{Deserialize, Serialize};

/// Contact details for the recipient of a fallback notification.
/// Resolved by the producer, which already has the user row loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub username: String,
}

/// What happened, from the point of view of an offline recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Someone sent the recipient a direct message.
    NewMessage { sender_username: String },
    /// Someone commented on one of the recipient's tweets.
    NewComment {
        commenter_username: String,
        comment: String,
    },
    /// Someone started following the recipient.
    NewFollower { follower_username: String },
}

/// A typed job for the notification fallback gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    pub recipient_id: Id,
    pub recipient: Recipient,
    pub payload: NotificationPayload,
}

impl NotificationJob {
    pub fn new(recipient_id: Id, recipient: Recipient, payload: NotificationPayload) -> Self {
        Self {
            recipient_id,
            recipient,
            payload,
        }
    }

    /// The event kind this job stands in for.
    pub fn kind(&self) -> EventKind {
        match self.payload {
            NotificationPayload::NewMessage { .. } => EventKind::ChatMessageNew,
            NotificationPayload::NewComment { .. } => EventKind::CommentsNew,
            NotificationPayload::NewFollower { .. } => EventKind::FollowersFollowed,
        }
    }
}
