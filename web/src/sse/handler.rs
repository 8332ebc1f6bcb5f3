use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::ws::handler::ConnectionGuard;
use crate::AppState;
use async_stream::stream;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use log::*;
use std::convert::Infallible;

/// SSE handler that establishes a long-lived, push-only connection.
/// Shares the registry with WebSockets, so it supersedes any socket the
/// same user holds and vice versa.
pub(crate) async fn sse_handler(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Response {
    debug!("Establishing SSE connection for user {user_id}");

    let manager = app_state.manager.clone();
    let (connection, mut rx) = match manager.connect(user_id) {
        Ok(connected) => connected,
        Err(e) => {
            error!("Failed to register SSE connection for user {user_id}: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Dropped with the stream when the client goes away
    let guard = ConnectionGuard::new(manager, connection.clone());

    let stream = stream! {
        let _guard = guard;
        loop {
            let frame = tokio::select! {
                frame = rx.recv() => frame,
                _ = connection.closed() => None,
            };

            match frame {
                Some(frame) => yield Ok::<Event, Infallible>(Event::default().data(frame)),
                None => break,
            }
        }

        debug!("SSE connection closed for user {user_id}, cleaning up");
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
