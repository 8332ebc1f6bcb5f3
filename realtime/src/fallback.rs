use events::NotificationJob;
use log::*;

/// Out-of-band delivery for recipients without a live connection (e.g. email).
///
/// `notify` must return immediately. Implementations spawn their own work and
/// swallow their own failures; nothing flows back to the dispatcher.
pub trait NotificationGateway: Send + Sync {
    fn notify(&self, job: NotificationJob);
}

/// Gateway used when no fallback channel is configured. Logs and drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGateway;

impl NotificationGateway for NoopGateway {
    fn notify(&self, job: NotificationJob) {
        debug!(
            "No fallback gateway configured, dropping {} notification for user {}",
            job.kind(),
            job.recipient_id
        );
    }
}
