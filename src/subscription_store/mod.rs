//! Email subscription storage.
//!
//! Each address moves through `unknown -> pending -> verified -> unknown`:
//! `start_subscription` issues a verification code, `verify_code` promotes the
//! address once the code matches, `resend_code` rotates the code of a pending
//! address, and `unsubscribe` forgets the address from either set.
//!
//! Pending timestamps are recorded but never used to expire codes.

mod code;
mod file;
mod memory;

pub use code::{generate_code, OsRandom, RandomSource, VerificationCode};
pub use file::{FileSubscriptionStore, PENDING_FILE, VERIFIED_FILE};
pub use memory::InMemorySubscriptionStore;

use crate::clock::Clock;
use crate::config::StoreType;
use crate::json_file::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A subscription awaiting its verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubscription {
    pub code: VerificationCode,
    /// Unix seconds when the current code was issued.
    pub timestamp: i64,
}

/// Pending subscriptions keyed by email.
pub type PendingMap = BTreeMap<String, PendingSubscription>;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Email already pending verification")]
    AlreadyPending,

    #[error("Invalid verification code or email not pending")]
    InvalidOrNotPending,

    #[error("Email is not pending verification")]
    NotPending,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Drop repeated addresses, keeping the first occurrence of each.
pub fn dedup_emails(emails: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    emails
        .into_iter()
        .filter(|email| seen.insert(email.clone()))
        .collect()
}

/// In-memory view of both subscription sets. Transition rules live here so
/// every backend applies them identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionBook {
    pending: PendingMap,
    verified: Vec<String>,
}

impl SubscriptionBook {
    /// Repeated verified addresses collapse into their first occurrence.
    pub fn new(pending: PendingMap, verified: Vec<String>) -> Self {
        Self {
            pending,
            verified: dedup_emails(verified),
        }
    }

    pub fn pending(&self) -> &PendingMap {
        &self.pending
    }

    pub fn verified(&self) -> &[String] {
        &self.verified
    }

    pub fn is_verified(&self, email: &str) -> bool {
        self.verified.iter().any(|e| e == email)
    }

    pub fn is_pending(&self, email: &str) -> bool {
        self.pending.contains_key(email)
    }

    pub fn start(
        &mut self,
        email: &str,
        code: VerificationCode,
        timestamp: i64,
    ) -> Result<(), SubscriptionError> {
        if self.is_verified(email) {
            return Err(SubscriptionError::AlreadyVerified);
        }
        if self.is_pending(email) {
            return Err(SubscriptionError::AlreadyPending);
        }
        self.pending
            .insert(email.to_string(), PendingSubscription { code, timestamp });
        Ok(())
    }

    /// Promote `email` to verified if `code` matches exactly.
    pub fn verify(&mut self, email: &str, code: &str) -> Result<(), SubscriptionError> {
        match self.pending.get(email) {
            Some(entry) if entry.code.as_str() == code => {}
            _ => return Err(SubscriptionError::InvalidOrNotPending),
        }
        self.pending.remove(email);
        self.verified.push(email.to_string());
        self.verified = dedup_emails(std::mem::take(&mut self.verified));
        Ok(())
    }

    /// Replace the code of a pending subscription.
    pub fn rotate(
        &mut self,
        email: &str,
        code: VerificationCode,
        timestamp: i64,
    ) -> Result<(), SubscriptionError> {
        let entry = self
            .pending
            .get_mut(email)
            .ok_or(SubscriptionError::NotPending)?;
        *entry = PendingSubscription { code, timestamp };
        Ok(())
    }

    /// Forget `email` everywhere. Returns whether anything was removed.
    pub fn unsubscribe(&mut self, email: &str) -> bool {
        let before = self.verified.len();
        self.verified.retain(|e| e != email);
        let was_verified = self.verified.len() != before;
        let was_pending = self.pending.remove(email).is_some();
        was_verified || was_pending
    }
}

/// Subscription store trait - implemented by all storage backends.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Register `email` as pending and return its verification code.
    async fn start_subscription(&self, email: &str) -> Result<VerificationCode, SubscriptionError>;

    /// Complete a pending subscription with the code last issued for it.
    async fn verify_code(&self, email: &str, code: &str) -> Result<(), SubscriptionError>;

    /// Issue a fresh code for a pending subscription.
    async fn resend_code(&self, email: &str) -> Result<VerificationCode, SubscriptionError>;

    /// Remove `email` from both sets. Succeeds when it was never subscribed.
    async fn unsubscribe(&self, email: &str) -> Result<(), SubscriptionError>;

    async fn is_verified(&self, email: &str) -> bool;

    async fn is_pending(&self, email: &str) -> bool;

    /// Verified addresses in stored order.
    async fn verified_subscribers(&self) -> Vec<String>;

    async fn pending_subscription(&self, email: &str) -> Option<PendingSubscription>;
}

/// Create a subscription store based on type and configuration.
pub fn create_subscription_store(
    store_type: StoreType,
    data_dir: PathBuf,
    pretty_json: bool,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
) -> Box<dyn SubscriptionStore> {
    match store_type {
        StoreType::Memory => Box::new(InMemorySubscriptionStore::new(clock, random)),
        StoreType::File => Box::new(
            FileSubscriptionStore::new(data_dir, clock, random).with_pretty(pretty_json),
        ),
    }
}
