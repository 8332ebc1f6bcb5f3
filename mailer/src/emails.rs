use crate::client::{MailerSendClient, SendEmailRequest, SendEmailRequestBuilder, SendEmailResponse};
use crate::error::Error;
use events::{NotificationJob, NotificationPayload};
use log::*;
use service::config::Config;

/// Wording of one offline notification, rendered through the shared template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEmail {
    pub subject: String,
    pub notification_text: String,
    /// Frontend path the "log in" button points at.
    pub path: &'static str,
}

impl NotificationEmail {
    pub fn for_payload(payload: &NotificationPayload) -> Self {
        match payload {
            NotificationPayload::NewMessage { sender_username } => Self {
                subject: "You have a new message".to_string(),
                notification_text: format!(
                    "You have a new message from {sender_username}! Please log in to view your messages."
                ),
                path: "/tweets",
            },
            NotificationPayload::NewComment {
                commenter_username,
                comment,
            } => Self {
                subject: "A user commented on your tweet".to_string(),
                notification_text: format!(
                    "{commenter_username} has commented \" {comment} \" on your tweet!"
                ),
                path: "/tweets",
            },
            NotificationPayload::NewFollower { follower_username } => Self {
                subject: "You have a new follower".to_string(),
                notification_text: format!("{follower_username} started following you!"),
                path: "/followers",
            },
        }
    }
}

/// Build the MailerSend request for a fallback notification job.
pub fn notification_request(config: &Config, job: &NotificationJob) -> Result<SendEmailRequest, Error> {
    let template_id = config.notification_email_template_id().ok_or_else(|| {
        error!("Notification email template ID not configured");
        Error::config()
    })?;

    let email = NotificationEmail::for_payload(&job.payload);
    let log_in_url = format!(
        "{}{}",
        config
            .frontend_base_url()
            .unwrap_or_default()
            .trim_end_matches('/'),
        email.path
    );

    SendEmailRequestBuilder::new()
        .from(config.notifications_from_email())
        .to_with_name(&job.recipient.email, &job.recipient.username)
        .subject(email.subject.as_str())
        .template_id(template_id)
        .add_personalization("subject", email.subject)
        .add_personalization("username", job.recipient.username.as_str())
        .add_personalization("notification_text", email.notification_text)
        .add_personalization("log_in_url", log_in_url)
        .build()
}

/// Send the email for one fallback notification job.
pub async fn send_notification_email(
    client: &MailerSendClient,
    config: &Config,
    job: &NotificationJob,
) -> Result<SendEmailResponse, Error> {
    info!(
        "Sending {} notification email to user {}",
        job.kind(),
        job.recipient_id
    );

    let request = notification_request(config, job)?;
    debug!("Email request created for {}", job.recipient.email);

    client.send_email(request).await
}
