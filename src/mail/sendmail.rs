//! Delivery through a local `sendmail` binary.

use super::{EmailMessage, MailError, Mailer};
use crate::util::is_valid_email;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SendmailMailer {
    program: PathBuf,
    from: String,
}

impl SendmailMailer {
    pub fn new(program: PathBuf, from: impl Into<String>) -> Self {
        Self {
            program,
            from: from.into(),
        }
    }

    /// Render a multipart/alternative message with headers.
    pub fn render(&self, message: &EmailMessage) -> String {
        let seed = format!(
            "{}:{}",
            message.to,
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let boundary = format!("{:x}", md5::compute(seed));
        format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: {subject}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\
             \r\n\
             --{boundary}\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\
             \r\n\
             {text}\r\n\
             --{boundary}\r\n\
             Content-Type: text/html; charset=UTF-8\r\n\
             \r\n\
             {html}\r\n\
             --{boundary}--\r\n",
            from = self.from,
            to = message.to,
            subject = message.subject,
            text = message.text_body,
            html = message.html_body,
        )
    }
}

#[async_trait]
impl Mailer for SendmailMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        // Also rules out CR/LF header injection through the recipient.
        if !is_valid_email(&message.to) {
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }
        if message.subject.contains(['\r', '\n']) {
            return Err(MailError::Transport("subject contains a line break".into()));
        }

        let mut child = Command::new(&self.program)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(MailError::Spawn)?;

        let rendered = self.render(message);
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(rendered.as_bytes())
                .await
                .map_err(|e| MailError::Transport(format!("write to sendmail: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MailError::Transport(format!("wait for sendmail: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MailError::Transport(format!(
                "sendmail exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        tracing::debug!("Handed message for {} to {}", message.to, self.program.display());
        Ok(())
    }
}
