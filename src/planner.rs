//! Application facade wiring the stores to the mailer.

use crate::clock::SystemClock;
use crate::config::Config;
use crate::mail::{create_mailer, verification_email, LinkBuilder, MailError, Mailer};
use crate::reminder::ReminderDispatcher;
use crate::subscription_store::{
    create_subscription_store, OsRandom, SubscriptionError, SubscriptionStore,
};
use crate::task_store::{create_task_store, TaskStore, TaskStoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Task(#[from] TaskStoreError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("Failed to send verification email: {0}")]
    Mail(#[from] MailError),
}

pub struct TaskPlanner {
    tasks: Arc<dyn TaskStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    mailer: Arc<dyn Mailer>,
    links: LinkBuilder,
}

impl TaskPlanner {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        mailer: Arc<dyn Mailer>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            tasks,
            subscriptions,
            mailer,
            links,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let tasks: Arc<dyn TaskStore> = create_task_store(
            config.store_type,
            config.data_dir.clone(),
            config.pretty_json,
        )
        .into();
        let subscriptions: Arc<dyn SubscriptionStore> = create_subscription_store(
            config.store_type,
            config.data_dir.clone(),
            config.pretty_json,
            Arc::new(SystemClock),
            Arc::new(OsRandom),
        )
        .into();
        let mailer = create_mailer(
            config.mailer,
            &config.mail_from,
            config.sendmail_path.clone(),
        );
        Self::new(
            tasks,
            subscriptions,
            mailer,
            LinkBuilder::new(config.base_url.clone()),
        )
    }

    pub fn tasks(&self) -> &dyn TaskStore {
        self.tasks.as_ref()
    }

    pub fn subscriptions(&self) -> &dyn SubscriptionStore {
        self.subscriptions.as_ref()
    }

    /// Start a subscription and mail the verification code.
    ///
    /// If the mail cannot be sent the address stays pending; `resend_code`
    /// recovers from that.
    pub async fn subscribe(&self, email: &str) -> Result<(), PlannerError> {
        let email = email.trim();
        let code = self.subscriptions.start_subscription(email).await?;
        self.mailer
            .send(&verification_email(&self.links, email, &code))
            .await?;
        tracing::info!("Verification email sent to {}", email);
        Ok(())
    }

    /// Rotate the code of a pending subscription and mail the new one.
    pub async fn resend_code(&self, email: &str) -> Result<(), PlannerError> {
        let email = email.trim();
        let code = self.subscriptions.resend_code(email).await?;
        self.mailer
            .send(&verification_email(&self.links, email, &code))
            .await?;
        tracing::info!("Resent verification code to {}", email);
        Ok(())
    }

    pub fn reminders(&self) -> ReminderDispatcher {
        ReminderDispatcher::new(
            self.tasks.clone(),
            self.subscriptions.clone(),
            self.mailer.clone(),
            self.links.clone(),
        )
    }

    pub async fn send_reminders(&self) -> usize {
        self.reminders().send_reminders().await
    }
}
