//! Message templates for verification and reminder mail.

use super::EmailMessage;
use crate::subscription_store::VerificationCode;
use crate::task_store::Task;
use url::Url;

pub const VERIFICATION_SUBJECT: &str = "Verify subscription to Task Planner";
pub const REMINDER_SUBJECT: &str = "Task Planner - Pending Tasks Reminder";
const NO_PENDING_TASKS: &str = "No pending tasks.";

/// Builds the public links embedded in outgoing mail.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn root(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn verify_link(&self, email: &str, code: &VerificationCode) -> String {
        format!(
            "{}/verify?email={}&code={}",
            self.root(),
            urlencoding::encode(email),
            urlencoding::encode(code.as_str())
        )
    }

    pub fn unsubscribe_link(&self, email: &str) -> String {
        format!(
            "{}/unsubscribe?email={}",
            self.root(),
            urlencoding::encode(email)
        )
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn verification_email(links: &LinkBuilder, email: &str, code: &VerificationCode) -> EmailMessage {
    let link = links.verify_link(email, code);
    let html_body = format!(
        "<p>Click the link below to verify your subscription to Task Planner:</p>\n\
         <p><a id=\"verification-link\" href=\"{link}\">Verify Subscription</a></p>\n\
         <p>Or enter this code: <strong>{code}</strong></p>\n",
        link = html_escape(&link),
        code = html_escape(code.as_str()),
    );
    let text_body = format!(
        "To verify your subscription to Task Planner, visit: {link}\n\
         Or enter this code: {code}\n",
        code = code.as_str(),
    );
    EmailMessage {
        to: email.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        html_body,
        text_body,
    }
}

pub fn reminder_email(links: &LinkBuilder, email: &str, pending: &[Task]) -> EmailMessage {
    let unsubscribe = links.unsubscribe_link(email);

    let (html_items, text_items) = if pending.is_empty() {
        (
            format!("<li>{}</li>\n", NO_PENDING_TASKS),
            format!("- {}\n", NO_PENDING_TASKS),
        )
    } else {
        pending.iter().fold(
            (String::new(), String::new()),
            |(mut html, mut text), task| {
                html.push_str(&format!("<li>{}</li>\n", html_escape(&task.name)));
                text.push_str(&format!("- {}\n", task.name));
                (html, text)
            },
        )
    };

    let html_body = format!(
        "<html>\n<body>\n\
         <h2>Pending Tasks Reminder</h2>\n\
         <p>Here are the current pending tasks:</p>\n\
         <ul>\n{html_items}</ul>\n\
         <p><a id=\"unsubscribe-link\" href=\"{link}\">Unsubscribe from notifications</a></p>\n\
         </body>\n</html>",
        link = html_escape(&unsubscribe),
    );
    let text_body = format!(
        "Pending Tasks Reminder\n\n\
         Here are the current pending tasks:\n\n\
         {text_items}\n\
         To unsubscribe, visit: {unsubscribe}\n\n\
         Best regards,\nTask Planner\n"
    );
    EmailMessage {
        to: email.to_string(),
        subject: REMINDER_SUBJECT.to_string(),
        html_body,
        text_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_store::TaskId;

    fn links() -> LinkBuilder {
        LinkBuilder::new(Url::parse("http://localhost:8000").unwrap())
    }

    fn task(id: u64, name: &str) -> Task {
        Task {
            id: TaskId::new(id),
            name: name.to_string(),
            completed: false,
        }
    }

    #[test]
    fn links_encode_query_values() {
        let links = links();
        assert_eq!(
            links.unsubscribe_link("a+b@y.com"),
            "http://localhost:8000/unsubscribe?email=a%2Bb%40y.com"
        );
        assert_eq!(
            links.verify_link("x@y.com", &VerificationCode::new("0a1b2c")),
            "http://localhost:8000/verify?email=x%40y.com&code=0a1b2c"
        );
    }

    #[test]
    fn links_keep_base_path() {
        let links = LinkBuilder::new(Url::parse("https://example.com/planner/").unwrap());
        assert_eq!(
            links.unsubscribe_link("x@y.com"),
            "https://example.com/planner/unsubscribe?email=x%40y.com"
        );
    }

    #[test]
    fn reminder_lists_escaped_task_names() {
        let msg = reminder_email(
            &links(),
            "x@y.com",
            &[task(1, "Fix <script> & stuff"), task(2, "Call mom")],
        );
        assert_eq!(msg.subject, REMINDER_SUBJECT);
        assert!(msg.html_body.contains("<li>Fix &lt;script&gt; &amp; stuff</li>"));
        assert!(msg.html_body.contains("<li>Call mom</li>"));
        assert!(msg.text_body.contains("- Fix <script> & stuff\n- Call mom\n"));
        assert!(msg
            .text_body
            .contains("http://localhost:8000/unsubscribe?email=x%40y.com"));
    }

    #[test]
    fn reminder_without_tasks_says_so() {
        let msg = reminder_email(&links(), "x@y.com", &[]);
        assert!(msg.html_body.contains("<li>No pending tasks.</li>"));
        assert!(msg.text_body.contains("- No pending tasks."));
    }

    #[test]
    fn verification_mail_carries_link_and_code() {
        let msg = verification_email(&links(), "x@y.com", &VerificationCode::new("abc123"));
        assert_eq!(msg.to, "x@y.com");
        assert_eq!(msg.subject, VERIFICATION_SUBJECT);
        assert!(msg
            .html_body
            .contains("href=\"http://localhost:8000/verify?email=x%40y.com&amp;code=abc123\""));
        assert!(msg.text_body.contains("code=abc123"));
    }
}
