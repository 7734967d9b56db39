//! Outgoing mail.
//!
//! The core only needs "send this message to this address"; transports sit
//! behind the [`Mailer`] trait:
//! - `log`: writes the message to the log (development default)
//! - `sendmail`: pipes a multipart message into a local `sendmail -t`
//! - [`RecordingMailer`]: keeps messages in memory, for tests

mod log;
mod recording;
mod sendmail;
pub mod templates;

pub use self::log::LogMailer;
pub use recording::RecordingMailer;
pub use sendmail::SendmailMailer;
pub use templates::{reminder_email, verification_email, LinkBuilder};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A rendered message with HTML and plain-text alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Failed to start mail transport: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Delivers messages. `Ok(())` means the transport accepted the message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Mailer type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailerType {
    #[default]
    Log,
    Sendmail,
}

impl MailerType {
    /// Parse from environment variable value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" | "none" => Some(Self::Log),
            "sendmail" | "smtp" => Some(Self::Sendmail),
            _ => None,
        }
    }
}

/// Create a mailer based on type and configuration.
pub fn create_mailer(mailer_type: MailerType, from: &str, sendmail_path: PathBuf) -> Arc<dyn Mailer> {
    match mailer_type {
        MailerType::Log => Arc::new(LogMailer),
        MailerType::Sendmail => Arc::new(SendmailMailer::new(sendmail_path, from)),
    }
}
