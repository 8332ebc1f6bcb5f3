use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::AppState;
use realtime::UserId;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresenceStatus {
    user_id: UserId,
    is_online: bool,
}

#[derive(Debug, Serialize)]
struct OnlineUsers {
    count: usize,
    users: Vec<UserId>,
}

/// GET whether a particular user is online
#[utoipa::path(
    get,
    path = "/presence/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User id to check")
    ),
    responses(
        (status = 200, description = "Presence of the user"),
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> impl IntoResponse {
    Json(PresenceStatus {
        user_id,
        is_online: app_state.manager.presence().is_online(user_id),
    })
}

/// GET every user currently online
#[utoipa::path(
    get,
    path = "/presence",
    responses(
        (status = 200, description = "All online user ids in ascending order"),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let users = app_state.manager.presence().online_users();
    Json(OnlineUsers {
        count: users.len(),
        users,
    })
}
