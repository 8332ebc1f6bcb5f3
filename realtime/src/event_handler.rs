use crate::dispatcher::Dispatched;
use crate::Manager;
use async_trait::async_trait;
use events::{Event, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles events from in-process producers by routing them through the
/// dispatcher.
///
/// Producers decide the audience and attach a fallback job when an offline
/// recipient should still hear about it; this handler just routes.
pub struct DispatchEventHandler {
    manager: Arc<Manager>,
}

impl DispatchEventHandler {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler for DispatchEventHandler {
    async fn handle(&self, event: &Event) {
        match self.manager.publish(event) {
            Dispatched::Direct(outcome) => {
                debug!("Handled {} event: {:?}", event.kind(), outcome)
            }
            Dispatched::Broadcast(report) => debug!(
                "Handled {} event: broadcast to {} user(s), {} failed",
                event.kind(),
                report.delivered,
                report.failed
            ),
        }
    }
}
