use super::{EmailMessage, MailError, Mailer};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Records every message in memory. Recipients registered with
/// [`RecordingMailer::fail_for`] get a transport error instead.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(recipient.into());
        }
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let should_fail = self
            .failing
            .lock()
            .map(|f| f.contains(&message.to))
            .unwrap_or(false);
        if should_fail {
            return Err(MailError::Transport(format!(
                "simulated failure for {}",
                message.to
            )));
        }
        self.sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(message.clone());
        Ok(())
    }
}
