//! Coordinates connection lifecycles with the registry and dispatcher.
//!
//! Transports (WebSocket, SSE) call [`Manager::connect`] when a client
//! arrives and [`Manager::disconnect`] from every exit path. Producers reach
//! the same dispatcher through [`Manager::submit`] or [`Manager::publish`].

use crate::connection::{Connection, UserId};
use crate::dispatcher::{Dispatched, Dispatcher};
use crate::error::Error;
use crate::fallback::NotificationGateway;
use crate::message::{self, ClientMessage, UserRef};
use crate::presence::Presence;
use crate::registry::ConnectionRegistry;
use events::{Event, EventKind, EventSubmission};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

// Number of locks users are striped across for presence transitions
const PRESENCE_STRIPES: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    /// Frames a connection may have queued before sends to it fail.
    pub outbound_queue_capacity: usize,
    /// Announce `chat.user.online` changes to every other connected user.
    pub broadcast_presence: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            broadcast_presence: true,
        }
    }
}

pub struct Manager {
    config: ManagerConfig,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    presence: Presence,
    /// Orders a user's registry change, online/offline decision and
    /// announcement against concurrent connects and disconnects for that user.
    presence_stripes: Vec<Mutex<()>>,
}

impl Manager {
    pub fn new(config: ManagerConfig, gateway: Arc<dyn NotificationGateway>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            config,
            dispatcher: Dispatcher::new(registry.clone(), gateway),
            presence: Presence::new(registry.clone()),
            registry,
            presence_stripes: (0..PRESENCE_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock_presence(&self, user_id: UserId) -> MutexGuard<'_, ()> {
        let index = user_id.rem_euclid(PRESENCE_STRIPES as UserId) as usize;
        // Guards no data, so poisoning carries no broken state
        self.presence_stripes[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh connection for `user_id` and return it with the
    /// receiving end of its outbound queue.
    ///
    /// Any previous connection for the user is superseded but left open.
    pub fn connect(
        &self,
        user_id: UserId,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<String>), Error> {
        let (connection, receiver) =
            Connection::channel(user_id, self.config.outbound_queue_capacity.max(1));
        let connection = Arc::new(connection);

        let _presence = self.lock_presence(user_id);
        let superseded = self.registry.register(connection.clone());
        connection.lifecycle().activate()?;

        match superseded {
            Some(previous) => debug!(
                "Connection {} supersedes {} for user {user_id}",
                connection.id(),
                previous.id()
            ),
            None => {
                info!("User {user_id} connected ({})", connection.id());
                if self.config.broadcast_presence {
                    self.dispatcher
                        .broadcast(user_id, &message::presence_changed(user_id, true));
                }
            }
        }

        Ok((connection, receiver))
    }

    /// Tear a connection down. Safe to call from any number of exit paths:
    /// only the first call does anything and returns `true`.
    pub fn disconnect(&self, connection: &Arc<Connection>) -> bool {
        if !connection.lifecycle().begin_close() {
            trace!("Connection {} already closing", connection.id());
            return false;
        }

        let user_id = connection.user_id();
        let presence = self.lock_presence(user_id);
        let removed = self.registry.deregister(connection);
        connection.close();

        // A stale teardown must not announce a user who reconnected as offline
        let still_online = self.registry.contains(&user_id);
        if !still_online {
            info!("User {user_id} disconnected ({})", connection.id());
            if self.config.broadcast_presence {
                self.dispatcher
                    .broadcast(user_id, &message::presence_changed(user_id, false));
            }
        } else {
            debug!(
                "Connection {} closed (deregistered: {removed}), user {user_id} has a newer connection",
                connection.id()
            );
        }
        drop(presence);

        if let Err(e) = connection.lifecycle().finish_close() {
            warn!("Connection {}: {e}", connection.id());
        }

        true
    }

    /// Validate a raw producer submission and route it.
    pub fn submit(&self, submission: EventSubmission) -> Result<Dispatched, Error> {
        let event = Event::try_from(submission).map_err(|e| {
            warn!("Rejected event submission: {e}");
            Error::from(e)
        })?;

        Ok(self.publish(&event))
    }

    pub fn publish(&self, event: &Event) -> Dispatched {
        self.dispatcher.dispatch(event)
    }

    /// Handle a frame the client sent over its connection.
    pub fn handle_client_message(&self, connection: &Connection, frame: &str) -> Result<(), Error> {
        let request: ClientMessage = serde_json::from_str(frame)?;

        match request.action.parse::<EventKind>() {
            Ok(EventKind::ChatUserTyping) => {
                let target: UserRef = serde_json::from_value(request.body)?;
                self.dispatcher.send_direct(
                    target.user_id,
                    &message::typing(connection.user_id(), target.user_id),
                );
            }
            Ok(EventKind::ChatUserOnline) => {
                let queried: UserRef = serde_json::from_value(request.body)?;
                let reply = message::presence_status(
                    queried.user_id,
                    self.presence.is_online(queried.user_id),
                );
                if let Err(e) = connection.send(reply.to_string()) {
                    debug!(
                        "Could not answer presence query on {}: {e}",
                        connection.id()
                    );
                }
            }
            _ => debug!(
                "Ignoring client action {:?} from user {}",
                request.action,
                connection.user_id()
            ),
        }

        Ok(())
    }

    /// Close every registered connection without presence announcements.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for (_, connection) in self.registry.snapshot() {
            if connection.lifecycle().begin_close() {
                self.registry.deregister(&connection);
                connection.close();
                if let Err(e) = connection.lifecycle().finish_close() {
                    warn!("Connection {}: {e}", connection.id());
                }
                closed += 1;
            }
        }

        info!("Closed {closed} connections");
        closed
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{job_for, RecordingGateway};
    use crate::dispatcher::DeliveryOutcome;
    use crate::error::RealtimeErrorKind;
    use crate::lifecycle::ConnectionState;
    use events::InvalidEventShape;
    use serde_json::{json, Value};

    fn manager() -> (Arc<Manager>, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let manager = Manager::new(ManagerConfig::default(), gateway.clone());
        (Arc::new(manager), gateway)
    }

    fn quiet_manager() -> (Arc<Manager>, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let config = ManagerConfig {
            broadcast_presence: false,
            ..ManagerConfig::default()
        };
        (Arc::new(Manager::new(config, gateway.clone())), gateway)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn presence_frame(user_id: UserId, is_online: bool) -> Value {
        json!({"action": "chat.user.online", "body": {"userId": user_id, "isOnline": is_online}})
    }

    #[tokio::test]
    async fn connect_activates_and_announces_to_others() {
        let (manager, _) = manager();
        let (_h1, mut rx1) = manager.connect(1).unwrap();
        let (h2, mut rx2) = manager.connect(2).unwrap();

        assert_eq!(h2.state(), ConnectionState::Active);
        assert!(manager.presence().is_online(2));
        assert_eq!(drain(&mut rx1), vec![presence_frame(2, true)]);
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn reconnect_supersedes_silently_and_keeps_old_handle_open() {
        let (manager, _) = manager();
        let (_observer, mut observer_rx) = manager.connect(9).unwrap();
        let (h1, _rx1) = manager.connect(1).unwrap();
        drain(&mut observer_rx);

        let (h2, _rx2) = manager.connect(1).unwrap();

        assert!(drain(&mut observer_rx).is_empty());
        assert!(h1.is_alive());
        assert_eq!(manager.registry().lookup(&1).unwrap().id(), h2.id());
    }

    #[tokio::test]
    async fn disconnect_deregisters_and_announces_offline() {
        let (manager, _) = manager();
        let (_observer, mut observer_rx) = manager.connect(9).unwrap();
        let (h1, _rx1) = manager.connect(1).unwrap();
        drain(&mut observer_rx);

        assert!(manager.disconnect(&h1));

        assert_eq!(h1.state(), ConnectionState::Closed);
        assert!(h1.is_close_requested());
        assert!(!manager.presence().is_online(1));
        assert_eq!(drain(&mut observer_rx), vec![presence_frame(1, false)]);
    }

    #[tokio::test]
    async fn disconnect_twice_is_a_no_op() {
        let (manager, _) = manager();
        let (_observer, mut observer_rx) = manager.connect(9).unwrap();
        let (h1, _rx1) = manager.connect(1).unwrap();
        drain(&mut observer_rx);

        assert!(manager.disconnect(&h1));
        assert!(!manager.disconnect(&h1));
        assert_eq!(drain(&mut observer_rx).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_disconnects_announce_offline_exactly_once() {
        let (manager, _) = manager();
        let (_observer, mut observer_rx) = manager.connect(9).unwrap();
        let (h1, _rx1) = manager.connect(1).unwrap();
        drain(&mut observer_rx);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let h1 = h1.clone();
                tokio::spawn(async move { manager.disconnect(&h1) })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(drain(&mut observer_rx), vec![presence_frame(1, false)]);
        assert!(manager.registry().lookup(&1).is_none());
    }

    #[tokio::test]
    async fn stale_disconnect_leaves_newer_connection_and_stays_quiet() {
        let (manager, _) = manager();
        let (_observer, mut observer_rx) = manager.connect(9).unwrap();
        let (h1, _rx1) = manager.connect(1).unwrap();
        let (h2, mut rx2) = manager.connect(1).unwrap();
        drain(&mut observer_rx);

        assert!(manager.disconnect(&h1));

        assert_eq!(manager.registry().lookup(&1).unwrap().id(), h2.id());
        assert!(drain(&mut observer_rx).is_empty());

        // The newer connection still receives direct events
        let event = Event::direct(EventKind::ChatMessageNew, 1, json!("hi"));
        assert_eq!(
            manager.publish(&event),
            Dispatched::Direct(DeliveryOutcome::Delivered)
        );
        assert_eq!(rx2.recv().await.as_deref(), Some("\"hi\""));
    }

    #[test]
    fn reconnect_racing_teardown_never_leaves_observers_seeing_offline() {
        for _ in 0..500 {
            let (manager, _) = manager();
            let (_observer, mut observer_rx) = manager.connect(9).unwrap();
            let (h1, _rx1) = manager.connect(1).unwrap();
            drain(&mut observer_rx);

            let barrier = Arc::new(std::sync::Barrier::new(2));
            let teardown = {
                let manager = manager.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.disconnect(&h1)
                })
            };

            barrier.wait();
            let (h2, _rx2) = manager.connect(1).unwrap();
            assert!(teardown.join().unwrap());

            assert_eq!(manager.registry().lookup(&1).unwrap().id(), h2.id());
            assert!(manager.presence().is_online(1));
            // Either the reconnect superseded silently or offline came first
            let frames = drain(&mut observer_rx);
            assert!(
                frames.is_empty() || frames == vec![presence_frame(1, false), presence_frame(1, true)],
                "unexpected presence frames: {frames:?}"
            );
        }
    }

    #[tokio::test]
    async fn presence_broadcast_can_be_disabled() {
        let (manager, _) = quiet_manager();
        let (_h1, mut rx1) = manager.connect(1).unwrap();
        let (h2, _rx2) = manager.connect(2).unwrap();
        manager.disconnect(&h2);

        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn submit_routes_a_valid_direct_event() {
        let (manager, _) = quiet_manager();
        let (_h42, mut rx) = manager.connect(42).unwrap();

        let submission: EventSubmission = serde_json::from_value(json!({
            "kind": "chat.message.new",
            "targetId": 42,
            "payload": "hi"
        }))
        .unwrap();

        assert_eq!(
            manager.submit(submission).unwrap(),
            Dispatched::Direct(DeliveryOutcome::Delivered)
        );
        assert_eq!(rx.recv().await.as_deref(), Some("\"hi\""));
    }

    #[tokio::test]
    async fn submit_to_offline_user_hands_fallback_to_gateway() {
        let (manager, gateway) = quiet_manager();

        let submission: EventSubmission = serde_json::from_value(json!({
            "kind": "chat.message.new",
            "targetId": 99,
            "payload": {"text": "hi"},
            "fallback": serde_json::to_value(job_for(99)).unwrap()
        }))
        .unwrap();

        assert_eq!(
            manager.submit(submission).unwrap(),
            Dispatched::Direct(DeliveryOutcome::ConnectionGone)
        );
        assert_eq!(gateway.jobs.lock().unwrap().len(), 1);
    }

    #[test]
    fn submit_rejects_ill_shaped_events() {
        let (manager, gateway) = quiet_manager();

        let both: EventSubmission = serde_json::from_value(json!({
            "kind": "comments.new",
            "targetId": 1,
            "originatorId": 2,
            "payload": {}
        }))
        .unwrap();
        let err = manager.submit(both).unwrap_err();
        assert_eq!(
            err.error_kind,
            RealtimeErrorKind::InvalidEventShape(InvalidEventShape::AmbiguousAudience)
        );

        let neither: EventSubmission =
            serde_json::from_value(json!({"kind": "comments.new", "payload": {}})).unwrap();
        let err = manager.submit(neither).unwrap_err();
        assert_eq!(
            err.error_kind,
            RealtimeErrorKind::InvalidEventShape(InvalidEventShape::MissingAudience)
        );

        assert!(gateway.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn typing_frames_are_relayed_to_the_named_user() {
        let (manager, gateway) = quiet_manager();
        let (h1, _rx1) = manager.connect(1).unwrap();
        let (_h2, mut rx2) = manager.connect(2).unwrap();

        manager
            .handle_client_message(&h1, r#"{"action":"chat.user.typing","body":{"userId":2}}"#)
            .unwrap();
        // Typing to an offline user is dropped without fallback
        manager
            .handle_client_message(&h1, r#"{"action":"chat.user.typing","body":{"userId":3}}"#)
            .unwrap();

        assert_eq!(
            drain(&mut rx2),
            vec![json!({"action": "chat.user.typing", "body": {"userId": 1, "isTyping": true}})]
        );
        assert!(gateway.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn online_query_is_answered_on_the_asking_connection() {
        let (manager, _) = quiet_manager();
        let (h1, mut rx1) = manager.connect(1).unwrap();
        let (_h2, _rx2) = manager.connect(2).unwrap();

        manager
            .handle_client_message(&h1, r#"{"action":"chat.user.online","body":{"userId":2}}"#)
            .unwrap();
        manager
            .handle_client_message(&h1, r#"{"action":"chat.user.online","body":{"userId":3}}"#)
            .unwrap();

        assert_eq!(
            drain(&mut rx1),
            vec![presence_frame(2, true), presence_frame(3, false)]
        );
    }

    #[test]
    fn malformed_client_frames_are_errors_and_unknown_actions_are_ignored() {
        let (manager, _) = quiet_manager();
        let (h1, _rx1) = manager.connect(1).unwrap();

        let err = manager.handle_client_message(&h1, "not json").unwrap_err();
        assert_eq!(err.error_kind, RealtimeErrorKind::MalformedClientMessage);

        let err = manager
            .handle_client_message(&h1, r#"{"action":"chat.user.typing","body":{}}"#)
            .unwrap_err();
        assert_eq!(err.error_kind, RealtimeErrorKind::MalformedClientMessage);

        assert!(manager
            .handle_client_message(&h1, r#"{"action":"ping"}"#)
            .is_ok());
    }

    #[tokio::test]
    async fn close_all_empties_the_registry_without_announcements() {
        let (manager, _) = manager();
        let (h1, mut rx1) = manager.connect(1).unwrap();
        let (h2, _rx2) = manager.connect(2).unwrap();
        drain(&mut rx1);

        assert_eq!(manager.close_all(), 2);

        assert!(manager.registry().is_empty());
        assert!(h1.is_close_requested() && h2.is_close_requested());
        assert_eq!(h1.state(), ConnectionState::Closed);
        assert!(drain(&mut rx1).is_empty());
        // Transports tearing down afterwards are no-ops
        assert!(!manager.disconnect(&h1));
    }
}
