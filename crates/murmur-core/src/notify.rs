//! Notification dispatcher: best-effort email when new feedback arrives.
//!
//! The dispatcher renders the message and hands it to a [`Mailer`] on a
//! detached task. Nothing it does can fail the submission that triggered
//! it: a missing transport is logged and skipped, transport errors and
//! timeouts are logged and dropped.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::TransportError;
use crate::types::FeedbackRecord;

pub const SUBJECT: &str = "New Anonymous Feedback Received";

/// A rendered notification ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound mail transport.
pub trait Mailer: Send + Sync {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), TransportError>>;
}

#[derive(Clone)]
pub struct Dispatcher {
    mailer: Option<Arc<dyn Mailer>>,
    admin_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("configured", &self.mailer.is_some())
            .field("admin_url", &self.admin_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(mailer: Option<Arc<dyn Mailer>>, admin_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            mailer,
            admin_url: admin_url.into(),
            timeout,
        }
    }

    /// A dispatcher with no transport; every notification is skipped.
    pub fn disabled() -> Self {
        Self::new(None, "http://localhost:3003", Duration::from_secs(10))
    }

    /// Send a notification for `record` to `to` on a detached task.
    ///
    /// Returns the task handle so tests can wait for delivery; callers on
    /// the request path drop it.
    pub fn notify(&self, record: &FeedbackRecord, to: &str) -> Option<JoinHandle<()>> {
        if self.mailer.is_none() {
            warn!(id = %record.id, "SMTP not configured, skipping email notification");
            return None;
        }

        let dispatcher = self.clone();
        let record = record.clone();
        let to = to.to_string();

        Some(tokio::spawn(async move {
            match dispatcher.deliver(&record, &to).await {
                Ok(()) => info!(id = %record.id, "notification email sent"),
                Err(e) => error!(id = %record.id, error = %e, "error sending notification email"),
            }
        }))
    }

    /// Render and send one notification, bounded by the transport timeout.
    pub async fn deliver(&self, record: &FeedbackRecord, to: &str) -> Result<(), TransportError> {
        let Some(mailer) = &self.mailer else {
            return Ok(());
        };

        let email = Email {
            to: to.to_string(),
            subject: SUBJECT.to_string(),
            html: render_html(record, &self.admin_url),
        };

        tokio::time::timeout(self.timeout, mailer.send(email))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

/// HTML body of the notification email.
pub fn render_html(record: &FeedbackRecord, admin_url: &str) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<h2>New Feedback Received</h2>");
    let _ = writeln!(html, "<p><strong>Page:</strong> {}</p>", escape(&record.page));
    let _ = writeln!(html, "<p><strong>Message:</strong></p>");
    let _ = writeln!(html, "<p>{}</p>", escape(&record.message));
    if let Some(follow_up) = &record.follow_up {
        let _ = writeln!(html, "<p><strong>Follow-up:</strong> {}</p>", escape(follow_up));
    }
    let _ = writeln!(
        html,
        "<p><strong>Time:</strong> {}</p>",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(html, "<hr>");
    let _ = write!(
        html,
        "<p><a href=\"{}\">View in Admin Panel</a></p>",
        escape(admin_url)
    );
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
