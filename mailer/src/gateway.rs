use crate::client::MailerSendClient;
use crate::emails::send_notification_email;
use crate::error::{Error, InternalErrorKind, MailerErrorKind};
use events::NotificationJob;
use log::*;
use realtime::NotificationGateway;
use service::config::Config;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Fallback gateway that emails recipients who could not be reached live.
///
/// Each job is sent on its own task so `notify` never waits on MailerSend.
pub struct EmailNotificationGateway {
    client: MailerSendClient,
    config: Arc<Config>,
    runtime: Handle,
}

impl EmailNotificationGateway {
    /// Must be called from within a tokio runtime; jobs are spawned onto it.
    pub fn new(config: Arc<Config>) -> Result<Self, Error> {
        if config.notification_email_template_id().is_none() {
            warn!("Notification email template ID not configured");
            return Err(Error::config());
        }

        let client = MailerSendClient::new(&config)?;
        let runtime = Handle::try_current().map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: MailerErrorKind::Internal(InternalErrorKind::Other(
                "No tokio runtime available".to_string(),
            )),
        })?;

        Ok(Self {
            client,
            config,
            runtime,
        })
    }
}

impl NotificationGateway for EmailNotificationGateway {
    fn notify(&self, job: NotificationJob) {
        let client = self.client.clone();
        let config = self.config.clone();

        self.runtime.spawn(async move {
            match send_notification_email(&client, &config, &job).await {
                Ok(response) => debug!(
                    "Notification email for user {} accepted, message_id: {:?}",
                    job.recipient_id, response.message_id
                ),
                Err(e) => warn!(
                    "Failed to send {} notification email to user {}: {e}",
                    job.kind(),
                    job.recipient_id
                ),
            }
        });
    }
}
