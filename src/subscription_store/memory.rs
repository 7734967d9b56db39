//! In-memory subscription store (non-persistent).

use super::{
    generate_code, PendingSubscription, RandomSource, SubscriptionBook, SubscriptionError,
    SubscriptionStore, VerificationCode,
};
use crate::clock::Clock;
use crate::util::{is_valid_email, normalize_email};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemorySubscriptionStore {
    book: Arc<RwLock<SubscriptionBook>>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl InMemorySubscriptionStore {
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            book: Arc::new(RwLock::new(SubscriptionBook::default())),
            clock,
            random,
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn start_subscription(&self, email: &str) -> Result<VerificationCode, SubscriptionError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(SubscriptionError::InvalidEmail(email));
        }
        let code = generate_code(self.random.as_ref());
        self.book
            .write()
            .await
            .start(&email, code.clone(), self.clock.unix_timestamp())?;
        Ok(code)
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<(), SubscriptionError> {
        self.book
            .write()
            .await
            .verify(&normalize_email(email), code)
    }

    async fn resend_code(&self, email: &str) -> Result<VerificationCode, SubscriptionError> {
        let code = generate_code(self.random.as_ref());
        self.book.write().await.rotate(
            &normalize_email(email),
            code.clone(),
            self.clock.unix_timestamp(),
        )?;
        Ok(code)
    }

    async fn unsubscribe(&self, email: &str) -> Result<(), SubscriptionError> {
        self.book.write().await.unsubscribe(&normalize_email(email));
        Ok(())
    }

    async fn is_verified(&self, email: &str) -> bool {
        self.book.read().await.is_verified(&normalize_email(email))
    }

    async fn is_pending(&self, email: &str) -> bool {
        self.book.read().await.is_pending(&normalize_email(email))
    }

    async fn verified_subscribers(&self) -> Vec<String> {
        self.book.read().await.verified().to_vec()
    }

    async fn pending_subscription(&self, email: &str) -> Option<PendingSubscription> {
        self.book
            .read()
            .await
            .pending()
            .get(&normalize_email(email))
            .cloned()
    }
}
