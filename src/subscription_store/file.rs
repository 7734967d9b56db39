//! JSON file-based subscription store.
//!
//! Pending and verified addresses live in two documents. Every mutation locks
//! the verified document first, then the pending one, and writes back only the
//! documents whose content changed.

use super::{
    dedup_emails, generate_code, PendingMap, PendingSubscription, RandomSource, SubscriptionBook,
    SubscriptionError, SubscriptionStore, VerificationCode,
};
use crate::clock::Clock;
use crate::json_file::JsonDocument;
use crate::util::{is_valid_email, normalize_email};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub const PENDING_FILE: &str = "pending_subscriptions.json";
pub const VERIFIED_FILE: &str = "subscribers.json";

#[derive(Clone)]
pub struct FileSubscriptionStore {
    pending: JsonDocument<PendingMap>,
    verified: JsonDocument<Vec<String>>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl FileSubscriptionStore {
    pub fn new(data_dir: PathBuf, clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            pending: JsonDocument::new(data_dir.join(PENDING_FILE)),
            verified: JsonDocument::new(data_dir.join(VERIFIED_FILE)),
            clock,
            random,
        }
    }

    pub fn with_pretty(self, pretty: bool) -> Self {
        Self {
            pending: self.pending.with_pretty(pretty),
            verified: self.verified.with_pretty(pretty),
            ..self
        }
    }

    fn load(&self) -> SubscriptionBook {
        SubscriptionBook::new(self.pending.load(), self.verified.load())
    }

    /// Lock both documents, apply `f`, and persist whatever it changed.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut SubscriptionBook) -> Result<R, SubscriptionError>,
    ) -> Result<R, SubscriptionError> {
        let verified_lock = self.verified.lock()?;
        let pending_lock = self.pending.lock()?;

        let original = self.load();
        let mut book = original.clone();
        let result = f(&mut book)?;

        let verified_changed = book.verified() != original.verified();
        if verified_changed {
            self.verified
                .write(&verified_lock, &book.verified().to_vec())?;
        }
        if book.pending() != original.pending() {
            if let Err(e) = self.pending.write(&pending_lock, book.pending()) {
                // Undo the verified write so no address ends up in both sets.
                if verified_changed {
                    if let Err(restore) = self
                        .verified
                        .write(&verified_lock, &original.verified().to_vec())
                    {
                        tracing::warn!(
                            "Failed to restore {} after pending write error: {}",
                            self.verified.path().display(),
                            restore
                        );
                    }
                }
                return Err(e.into());
            }
        }
        Ok(result)
    }

    fn issue_code(&self) -> (VerificationCode, i64) {
        (
            generate_code(self.random.as_ref()),
            self.clock.unix_timestamp(),
        )
    }
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn start_subscription(&self, email: &str) -> Result<VerificationCode, SubscriptionError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            tracing::info!("Rejected subscription for invalid email {:?}", email);
            return Err(SubscriptionError::InvalidEmail(email));
        }
        let (code, timestamp) = self.issue_code();
        self.mutate(|book| book.start(&email, code.clone(), timestamp))
            .map_err(|e| {
                tracing::info!("Subscription for {} not started: {}", email, e);
                e
            })?;
        tracing::info!("Added pending subscriber: {}", email);
        Ok(code)
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<(), SubscriptionError> {
        let email = normalize_email(email);
        self.mutate(|book| book.verify(&email, code))
            .map_err(|e| {
                tracing::info!("Verification failed for {}: {}", email, e);
                e
            })?;
        tracing::info!("Verified subscriber: {}", email);
        Ok(())
    }

    async fn resend_code(&self, email: &str) -> Result<VerificationCode, SubscriptionError> {
        let email = normalize_email(email);
        let (code, timestamp) = self.issue_code();
        self.mutate(|book| book.rotate(&email, code.clone(), timestamp))
            .map_err(|e| {
                tracing::info!("Resend refused for {}: {}", email, e);
                e
            })?;
        tracing::info!("Rotated verification code for {}", email);
        Ok(code)
    }

    async fn unsubscribe(&self, email: &str) -> Result<(), SubscriptionError> {
        let email = normalize_email(email);
        let removed = self.mutate(|book| Ok(book.unsubscribe(&email)))?;
        if removed {
            tracing::info!("Unsubscribed email: {}", email);
        } else {
            tracing::debug!("Unsubscribe for unknown email {}", email);
        }
        Ok(())
    }

    async fn is_verified(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.verified.load().contains(&email)
    }

    async fn is_pending(&self, email: &str) -> bool {
        self.pending.load().contains_key(&normalize_email(email))
    }

    async fn verified_subscribers(&self) -> Vec<String> {
        dedup_emails(self.verified.load())
    }

    async fn pending_subscription(&self, email: &str) -> Option<PendingSubscription> {
        self.pending.load().remove(&normalize_email(email))
    }
}
