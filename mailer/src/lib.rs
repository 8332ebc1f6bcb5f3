//! Email fallback for users who are not connected when something happens
//! to them (a new message, a comment on their tweet, a new follower).
//!
//! Emails go through the MailerSend API using a single notification
//! template; the wording for each kind is filled in as template variables.

pub mod client;
pub mod emails;
pub mod error;
pub mod gateway;

pub use gateway::EmailNotificationGateway;
