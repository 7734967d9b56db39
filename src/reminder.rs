//! Reminder broadcast: one mail with the pending tasks to every verified subscriber.
//!
//! Intended to be triggered periodically (e.g. from cron via `task-planner send-reminders`).
//! Delivery is best-effort: a failed recipient is logged and skipped, never retried here.

use crate::mail::{reminder_email, LinkBuilder, Mailer};
use crate::subscription_store::SubscriptionStore;
use crate::task_store::TaskStore;
use crate::util::is_valid_email;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReminderDispatcher {
    tasks: Arc<dyn TaskStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    mailer: Arc<dyn Mailer>,
    links: LinkBuilder,
}

impl ReminderDispatcher {
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

    /// Send the reminder to every verified subscriber. Returns the number of
    /// deliveries the mailer accepted.
    pub async fn send_reminders(&self) -> usize {
        let subscribers = self.subscriptions.verified_subscribers().await;
        if subscribers.is_empty() {
            info!("No verified subscribers, skipping reminders");
            return 0;
        }

        let pending = self.tasks.list_pending().await;
        let mut delivered = 0;
        for email in &subscribers {
            if !is_valid_email(email) {
                warn!("Skipping reminder for invalid address {:?}", email);
                continue;
            }
            let message = reminder_email(&self.links, email, &pending);
            match self.mailer.send(&message).await {
                Ok(()) => {
                    delivered += 1;
                    info!("Reminder sent to {}", email);
                }
                Err(e) => warn!("Failed to send reminder to {}: {}", email, e),
            }
        }

        info!(
            "Sent pending tasks ({}) to {} of {} subscribers",
            pending.len(),
            delivered,
            subscribers.len()
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::mail::RecordingMailer;
    use crate::subscription_store::{FileSubscriptionStore, OsRandom};
    use crate::task_store::FileTaskStore;
    use url::Url;

    struct Fixture {
        temp: tempfile::TempDir,
        tasks: Arc<FileTaskStore>,
        subscriptions: Arc<FileSubscriptionStore>,
        mailer: RecordingMailer,
        dispatcher: ReminderDispatcher,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let tasks = Arc::new(FileTaskStore::new(temp.path().to_path_buf()));
        let subscriptions = Arc::new(FileSubscriptionStore::new(
            temp.path().to_path_buf(),
            Arc::new(FixedClock::from_unix(0)),
            Arc::new(OsRandom),
        ));
        let mailer = RecordingMailer::new();
        let dispatcher = ReminderDispatcher::new(
            tasks.clone(),
            subscriptions.clone(),
            Arc::new(mailer.clone()),
            LinkBuilder::new(Url::parse("http://localhost:8000").unwrap()),
        );
        Fixture {
            temp,
            tasks,
            subscriptions,
            mailer,
            dispatcher,
        }
    }

    async fn subscribe(store: &FileSubscriptionStore, email: &str) {
        let code = store.start_subscription(email).await.unwrap();
        store.verify_code(email, code.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn no_subscribers_sends_nothing() {
        let f = fixture();
        f.tasks.add_task("A").await.unwrap();
        f.subscriptions.start_subscription("pending@y.com").await.unwrap();

        assert_eq!(f.dispatcher.send_reminders().await, 0);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn every_verified_subscriber_gets_one_mail_in_order() {
        let f = fixture();
        let done = f.tasks.add_task("Done already").await.unwrap();
        f.tasks.add_task("Still open").await.unwrap();
        f.tasks.set_completed(done.id, true).await.unwrap();
        for email in ["a@y.com", "b@y.com", "c@y.com"] {
            subscribe(&f.subscriptions, email).await;
        }

        assert_eq!(f.dispatcher.send_reminders().await, 3);

        let sent = f.mailer.sent();
        let recipients: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(recipients, vec!["a@y.com", "b@y.com", "c@y.com"]);
        for message in &sent {
            assert!(message.html_body.contains("<li>Still open</li>"));
            assert!(!message.html_body.contains("Done already"));
            assert!(message
                .html_body
                .contains(&urlencoding::encode(&message.to).into_owned()));
        }
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_stop_the_rest() {
        let f = fixture();
        for email in ["a@y.com", "b@y.com", "c@y.com"] {
            subscribe(&f.subscriptions, email).await;
        }
        f.mailer.fail_for("b@y.com");

        assert_eq!(f.dispatcher.send_reminders().await, 2);
        let recipients: Vec<_> = f.mailer.sent().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["a@y.com".to_string(), "c@y.com".to_string()]);
    }

    #[tokio::test]
    async fn invalid_stored_address_counts_as_failed() {
        let f = fixture();
        std::fs::write(
            f.temp
                .path()
                .join(crate::subscription_store::VERIFIED_FILE),
            br#"["a@y.com","not-an-email","c@y.com"]"#,
        )
        .unwrap();

        assert_eq!(f.dispatcher.send_reminders().await, 2);
        let recipients: Vec<_> = f.mailer.sent().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["a@y.com".to_string(), "c@y.com".to_string()]);
    }

    #[tokio::test]
    async fn duplicated_subscriber_gets_a_single_mail() {
        let f = fixture();
        std::fs::write(
            f.temp
                .path()
                .join(crate::subscription_store::VERIFIED_FILE),
            br#"["a@y.com","a@y.com"]"#,
        )
        .unwrap();
        subscribe(&f.subscriptions, "b@y.com").await;

        assert_eq!(f.dispatcher.send_reminders().await, 2);
        let recipients: Vec<_> = f.mailer.sent().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["a@y.com".to_string(), "b@y.com".to_string()]);
    }

    #[tokio::test]
    async fn empty_task_list_still_sends_placeholder() {
        let f = fixture();
        subscribe(&f.subscriptions, "a@y.com").await;

        assert_eq!(f.dispatcher.send_reminders().await, 1);
        assert!(f.mailer.sent()[0].html_body.contains("No pending tasks."));
    }

    #[tokio::test]
    async fn unreadable_subscriber_list_sends_nothing() {
        let f = fixture();
        std::fs::write(
            f.temp
                .path()
                .join(crate::subscription_store::VERIFIED_FILE),
            b"not json",
        )
        .unwrap();

        assert_eq!(f.dispatcher.send_reminders().await, 0);
    }
}
