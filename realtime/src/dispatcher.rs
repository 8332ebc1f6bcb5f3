use crate::connection::{Connection, UserId};
use crate::fallback::NotificationGateway;
use crate::registry::ConnectionRegistry;
use events::{Audience, Event, NotificationJob};
use log::*;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Result of a single direct delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The frame was queued on the recipient's live connection.
    Delivered,
    /// The recipient has no registered connection.
    ConnectionGone,
    /// A connection was registered but refused the frame (closed or full).
    /// The connection has been evicted from the registry.
    SendFailed,
}

impl DeliveryOutcome {
    pub fn needs_fallback(&self) -> bool {
        !matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Tally of one broadcast. Failures are already contained and logged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// What happened to a routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Direct(DeliveryOutcome),
    Broadcast(BroadcastReport),
}

/// Running delivery counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    connection_gone: AtomicU64,
    send_failed: AtomicU64,
    fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub delivered: u64,
    pub connection_gone: u64,
    pub send_failed: u64,
    pub fallbacks: u64,
}

impl DispatchStats {
    fn record(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Delivered => &self.delivered,
            DeliveryOutcome::ConnectionGone => &self.connection_gone,
            DeliveryOutcome::SendFailed => &self.send_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            connection_gone: self.connection_gone.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Routes events to live connections and falls back to the gateway when a
/// direct recipient cannot be reached.
///
/// There is no separate "is the user online" check before sending: the send
/// attempt itself decides whether fallback is needed, so presence cannot go
/// stale between the check and the push.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    gateway: Arc<dyn NotificationGateway>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            registry,
            gateway,
            stats: DispatchStats::default(),
        }
    }

    /// Push `event` to `target`'s live connection, if any.
    pub fn send_direct(&self, target: UserId, event: &Event) -> DeliveryOutcome {
        let outcome = match self.registry.lookup(&target) {
            Some(connection) => self.push(&connection, encode(event)),
            None => {
                debug!(
                    "No live connection for user {target}, {} not delivered",
                    event.kind()
                );
                DeliveryOutcome::ConnectionGone
            }
        };

        self.stats.record(outcome);
        outcome
    }

    /// Push `event` to every registered user except `originator`.
    ///
    /// A failing recipient never stops delivery to the rest, and nothing is retried.
    pub fn broadcast(&self, originator: UserId, event: &Event) -> BroadcastReport {
        let frame = encode(event);
        let mut report = BroadcastReport::default();

        for (user_id, connection) in self.registry.snapshot() {
            if user_id == originator {
                continue;
            }

            let outcome = self.push(&connection, frame.clone());
            self.stats.record(outcome);
            match outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                _ => report.failed += 1,
            }
        }

        debug!(
            "Broadcast {} from user {originator}: {} delivered, {} failed",
            event.kind(),
            report.delivered,
            report.failed
        );

        report
    }

    /// Try direct delivery, and hand `job` to the fallback gateway if it fails.
    pub fn route_with_fallback(
        &self,
        target: UserId,
        event: &Event,
        job: NotificationJob,
    ) -> DeliveryOutcome {
        let outcome = self.send_direct(target, event);

        if outcome.needs_fallback() {
            debug!(
                "Falling back to gateway for user {target} ({:?}, {})",
                outcome,
                job.kind()
            );
            self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
            self.gateway.notify(job);
        }

        outcome
    }

    /// Route an event according to its audience.
    pub fn dispatch(&self, event: &Event) -> Dispatched {
        match event.audience() {
            Audience::Direct { target } => Dispatched::Direct(match event.fallback() {
                Some(job) => self.route_with_fallback(target, event, job.clone()),
                None => self.send_direct(target, event),
            }),
            Audience::Broadcast { originator } => {
                if event.fallback().is_some() {
                    debug!("Ignoring fallback job attached to broadcast {}", event.kind());
                }
                Dispatched::Broadcast(self.broadcast(originator, event))
            }
        }
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    fn push(&self, connection: &Arc<Connection>, frame: String) -> DeliveryOutcome {
        match connection.send(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(
                    "Failed to send to connection {} for user {}: {e}. Evicting connection.",
                    connection.id(),
                    connection.user_id()
                );
                self.evict(connection);
                DeliveryOutcome::SendFailed
            }
        }
    }

    // Compare-and-remove, so a fresher connection for the same user survives.
    fn evict(&self, connection: &Arc<Connection>) {
        if self.registry.deregister(connection) {
            debug!("Evicted dead connection {}", connection.id());
        }
        connection.close();
    }
}

// Value's Display is its compact JSON encoding and cannot fail
fn encode(event: &Event) -> String {
    event.payload().to_string()
}
