//! In-process mail transports for notification tests.
//!
//! - [`ChannelMailer`] forwards every [`Email`] onto an unbounded channel so a
//!   test can await delivery with a timeout.
//! - [`FailingMailer`] rejects every send, optionally reporting the attempt on
//!   a channel first.
//!
//! # Example
//!
//! ```rust,no_run
//! let (mailer, mut inbox) = ChannelMailer::new();
//! let app = TestApp::with_mailer(mailer);
//! // ... submit feedback ...
//! let email = inbox.next_email().await.expect("notification");
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use murmur_core::notify::{Email, Mailer};
use murmur_core::TransportError;
use tokio::sync::mpsc;

/// Receiving end of a fake mailer.
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Email>,
}

impl Inbox {
    /// Wait up to one second for the next email.
    pub async fn next_email(&mut self) -> Option<Email> {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// True if nothing is waiting right now.
    pub fn is_empty(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

pub struct ChannelMailer {
    tx: mpsc::UnboundedSender<Email>,
}

impl ChannelMailer {
    pub fn new() -> (Arc<dyn Mailer>, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), Inbox { rx })
    }
}

impl Mailer for ChannelMailer {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), TransportError>> {
        let _ = self.tx.send(email);
        Box::pin(async { Ok(()) })
    }
}

pub struct FailingMailer {
    attempts: mpsc::UnboundedSender<Email>,
}

impl FailingMailer {
    pub fn new() -> (Arc<dyn Mailer>, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { attempts: tx }), Inbox { rx })
    }
}

impl Mailer for FailingMailer {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), TransportError>> {
        let _ = self.attempts.send(email);
        Box::pin(async { Err(TransportError::Send("connection refused".to_string())) })
    }
}
