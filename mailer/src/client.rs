use crate::error::{Error, ExternalErrorKind, InternalErrorKind, MailerErrorKind};
use email_address::EmailAddress;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service::config::Config;

/// MailerSend API client for sending transactional emails
#[derive(Debug, Clone)]
pub struct MailerSendClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecipient {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSender {
    pub email: String,
    pub name: Option<String>,
}

/// Template variables for one recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Personalization {
    pub email: String,
    pub data: Map<String, Value>,
}

/// Request payload for sending an email via MailerSend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendEmailRequest {
    pub from: EmailSender,
    pub to: Vec<EmailRecipient>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personalization: Vec<Personalization>,
}

#[derive(Debug, Deserialize)]
pub struct SendEmailResponse {
    pub message_id: Option<String>,
}

/// Builds a [`SendEmailRequest`], collecting template variables for the
/// first recipient.
#[derive(Debug, Default)]
pub struct SendEmailRequestBuilder {
    from: Option<EmailSender>,
    to: Vec<EmailRecipient>,
    subject: Option<String>,
    text: Option<String>,
    template_id: Option<String>,
    data: Map<String, Value>,
}

impl SendEmailRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(EmailSender {
            email: email.into(),
            name: None,
        });
        self
    }

    pub fn to_with_name(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.to.push(EmailRecipient {
            email: email.into(),
            name: Some(name.into()),
        });
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn add_personalization(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> Result<SendEmailRequest, Error> {
        let from = self.from.ok_or_else(|| missing("sender"))?;
        let subject = self.subject.ok_or_else(|| missing("subject"))?;
        let first = self.to.first().ok_or_else(|| missing("recipient"))?;

        let personalization = if self.data.is_empty() {
            Vec::new()
        } else {
            vec![Personalization {
                email: first.email.clone(),
                data: self.data,
            }]
        };

        Ok(SendEmailRequest {
            from,
            to: self.to,
            subject,
            text: self.text,
            template_id: self.template_id,
            personalization,
        })
    }
}

fn missing(field: &str) -> Error {
    Error {
        source: None,
        error_kind: MailerErrorKind::Internal(InternalErrorKind::Other(format!(
            "Email request is missing a {field}"
        ))),
    }
}

impl MailerSendClient {
    /// Create a new MailerSend client with authentication
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = build_client(config)?;
        let base_url = config.mailersend_base_url().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Send an email using MailerSend API
    pub async fn send_email(&self, request: SendEmailRequest) -> Result<SendEmailResponse, Error> {
        if !is_valid_email(&request.from.email) {
            warn!("Invalid sender email: {}", request.from.email);
            return Err(Error::invalid_address(&request.from.email));
        }

        for recipient in &request.to {
            if !is_valid_email(&recipient.email) {
                warn!("Invalid recipient email: {}", recipient.email);
                return Err(Error::invalid_address(&recipient.email));
            }
        }

        let url = format!("{}/email", self.base_url);

        info!("Sending email to {} recipients", request.to.len());
        debug!("Email subject: {}", request.subject);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to send email request: {e:?}");
                Error::from(e)
            })?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            info!("Email sent successfully, message_id: {:?}", message_id);

            Ok(SendEmailResponse { message_id })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Failed to send email: {} - {}", status, error_text);
            Err(Error {
                source: None,
                error_kind: MailerErrorKind::External(ExternalErrorKind::Rejected(
                    status.as_u16(),
                )),
            })
        }
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client, Error> {
    let headers = build_auth_headers(config)?;

    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .build()?)
}

fn build_auth_headers(config: &Config) -> Result<reqwest::header::HeaderMap, Error> {
    let api_key = config.mailersend_api_key().ok_or_else(|| {
        warn!("Failed to get MailerSend API key from config");
        Error::config()
    })?;

    let mut headers = reqwest::header::HeaderMap::new();
    let mut auth_header = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|err| {
            warn!("Failed to create authorization header value: {err:?}");
            Error {
                source: Some(Box::new(err)),
                error_kind: MailerErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to create authorization header value".to_string(),
                )),
            }
        })?;
    auth_header.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth_header);

    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    Ok(headers)
}

pub fn is_valid_email(email: &str) -> bool {
    EmailAddress::is_valid(email)
}
