use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of event kinds understood by clients.
/// The serialized form is the dotted wire name clients switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "chat.message.new")]
    ChatMessageNew,
    #[serde(rename = "chat.message.deleted")]
    ChatMessageDeleted,
    #[serde(rename = "chat.user.online")]
    ChatUserOnline,
    #[serde(rename = "chat.user.typing")]
    ChatUserTyping,
    #[serde(rename = "comments.new")]
    CommentsNew,
    #[serde(rename = "comments.updated")]
    CommentsUpdated,
    #[serde(rename = "comments.deleted")]
    CommentsDeleted,
    #[serde(rename = "comments.likes.changed")]
    CommentsLikesChanged,
    #[serde(rename = "tweets.likes.changed")]
    TweetsLikesChanged,
    #[serde(rename = "followers.followed")]
    FollowersFollowed,
    #[serde(rename = "followers.unfollowed")]
    FollowersUnfollowed,
    #[serde(rename = "auth.required")]
    AuthRequired,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ChatMessageNew,
        EventKind::ChatMessageDeleted,
        EventKind::ChatUserOnline,
        EventKind::ChatUserTyping,
        EventKind::CommentsNew,
        EventKind::CommentsUpdated,
        EventKind::CommentsDeleted,
        EventKind::CommentsLikesChanged,
        EventKind::TweetsLikesChanged,
        EventKind::FollowersFollowed,
        EventKind::FollowersUnfollowed,
        EventKind::AuthRequired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ChatMessageNew => "chat.message.new",
            EventKind::ChatMessageDeleted => "chat.message.deleted",
            EventKind::ChatUserOnline => "chat.user.online",
            EventKind::ChatUserTyping => "chat.user.typing",
            EventKind::CommentsNew => "comments.new",
            EventKind::CommentsUpdated => "comments.updated",
            EventKind::CommentsDeleted => "comments.deleted",
            EventKind::CommentsLikesChanged => "comments.likes.changed",
            EventKind::TweetsLikesChanged => "tweets.likes.changed",
            EventKind::FollowersFollowed => "followers.followed",
            EventKind::FollowersUnfollowed => "followers.unfollowed",
            EventKind::AuthRequired => "auth.required",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a wire name is not part of the closed kind set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back_to_their_kind() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
    }

    #[test]
    fn serde_uses_the_dotted_wire_name() {
        let json = serde_json::to_string(&EventKind::CommentsLikesChanged).unwrap();
        assert_eq!(json, "\"comments.likes.changed\"");

        let kind: EventKind = serde_json::from_str("\"followers.unfollowed\"").unwrap();
        assert_eq!(kind, EventKind::FollowersUnfollowed);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "messages.new".parse::<EventKind>(),
            Err(UnknownEventKind("messages.new".to_string()))
        );
        assert!("".parse::<EventKind>().is_err());
        // Case matters on the wire
        assert!("Chat.Message.New".parse::<EventKind>().is_err());
    }
}
