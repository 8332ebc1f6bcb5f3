//! Wire frames exchanged with clients that the core itself builds or reads.
//!
//! Everything producers send is opaque to this crate; these are only the
//! frames for presence, typing relays and the unauthenticated handshake.

use crate::connection::UserId;
use events::{envelope, Event, EventKind};
use serde::Deserialize;
use serde_json::{json, Value};

/// A frame sent by a client over its live connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub action: String,
    #[serde(default)]
    pub body: Value,
}

/// Body of client requests that name another user.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: UserId,
}

/// `chat.user.online` broadcast announcing that `user_id` came or went.
pub fn presence_changed(user_id: UserId, is_online: bool) -> Event {
    Event::broadcast(
        EventKind::ChatUserOnline,
        user_id,
        envelope(
            EventKind::ChatUserOnline,
            json!({ "userId": user_id, "isOnline": is_online }),
        ),
    )
}

/// Reply to a client asking whether `user_id` is online.
pub fn presence_status(user_id: UserId, is_online: bool) -> Value {
    envelope(
        EventKind::ChatUserOnline,
        json!({ "userId": user_id, "isOnline": is_online }),
    )
}

/// `chat.user.typing` relayed from `typist` to `target`.
pub fn typing(typist: UserId, target: UserId) -> Event {
    Event::direct(
        EventKind::ChatUserTyping,
        target,
        envelope(
            EventKind::ChatUserTyping,
            json!({ "userId": typist, "isTyping": true }),
        ),
    )
}

/// The single frame sent to a socket that arrived without an identity.
pub fn auth_required() -> String {
    json!({
        "action": EventKind::AuthRequired.as_str(),
        "message": "Authentication failed",
        "status": 401,
    })
    .to_string()
}
