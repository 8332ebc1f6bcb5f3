use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use log::*;
use realtime::message::auth_required;
use realtime::{Connection, Manager, UserId};
use std::sync::Arc;

/// Tears the connection down when the socket task ends, however it ends.
pub(crate) struct ConnectionGuard {
    manager: Arc<Manager>,
    connection: Arc<Connection>,
}

impl ConnectionGuard {
    pub(crate) fn new(manager: Arc<Manager>, connection: Arc<Connection>) -> Self {
        Self {
            manager,
            connection,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.disconnect(&self.connection);
    }
}

/// WebSocket endpoint. Sockets without an identity get a single
/// `auth.required` frame and are closed.
pub(crate) async fn ws_handler(
    user: Option<AuthenticatedUser>,
    State(app_state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let manager = app_state.manager.clone();

    ws.on_upgrade(move |socket| async move {
        match user {
            Some(AuthenticatedUser(user_id)) => handle_socket(socket, user_id, manager).await,
            None => reject(socket).await,
        }
    })
}

async fn reject(mut socket: WebSocket) {
    debug!("Rejecting unauthenticated WebSocket");
    if let Err(e) = socket.send(Message::Text(auth_required())).await {
        debug!("Failed to send auth.required frame: {e}");
    }
    let _ = socket.close().await;
}

async fn handle_socket(socket: WebSocket, user_id: UserId, manager: Arc<Manager>) {
    let (connection, mut outbound) = match manager.connect(user_id) {
        Ok(connected) => connected,
        Err(e) => {
            error!("Failed to register WebSocket for user {user_id}: {e}");
            return;
        }
    };
    let _guard = ConnectionGuard::new(manager.clone(), connection.clone());

    debug!(
        "WebSocket connection {} established for user {user_id}",
        connection.id()
    );

    // This task is the only writer, so frames go out in queue order
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    debug!("WebSocket write to user {user_id} failed: {e}");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = manager.handle_client_message(&connection, &text) {
                        warn!("Ignoring frame from user {user_id}: {e}");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket read from user {user_id} failed: {e}");
                    break;
                }
            },
            _ = connection.closed() => {
                debug!("Connection {} asked to close", connection.id());
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    debug!(
        "WebSocket connection {} closed for user {user_id}, cleaning up",
        connection.id()
    );
}
