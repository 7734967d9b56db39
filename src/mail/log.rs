use super::{EmailMessage, MailError, Mailer};
use async_trait::async_trait;

/// Logs messages instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery disabled, logging message"
        );
        tracing::debug!("Plain-text body for {}:\n{}", message.to, message.text_body);
        Ok(())
    }
}
