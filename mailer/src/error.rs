//! Error types for the `mailer` crate.
//!
//! Same shape as the rest of the workspace: a root `Error` holding the
//! original `source` and a tree of `error_kind` enums. None of these ever
//! reach the dispatcher; the gateway logs them and moves on.
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: MailerErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum MailerErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// A required setting (API key, template id) is missing.
    Config,
    InvalidAddress(String),
    Other(String),
}

#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// MailerSend answered with a non-success status.
    Rejected(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            MailerErrorKind::Internal(InternalErrorKind::InvalidAddress(address)) => {
                write!(f, "Invalid email address: {address}")
            }
            MailerErrorKind::External(ExternalErrorKind::Rejected(status)) => {
                write!(f, "MailerSend rejected the request with status {status}")
            }
            _ => write!(f, "Mailer Error: {self:?}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl Error {
    pub(crate) fn config() -> Self {
        Error {
            source: None,
            error_kind: MailerErrorKind::Internal(InternalErrorKind::Config),
        }
    }

    pub(crate) fn invalid_address(address: &str) -> Self {
        Error {
            source: None,
            error_kind: MailerErrorKind::Internal(InternalErrorKind::InvalidAddress(
                address.to_string(),
            )),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Builder errors happen before any network call is made
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: MailerErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: MailerErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}
