//! murmur-smtp: SMTP transport for feedback notifications.
//!
//! Implements [`murmur_core::notify::Mailer`] on top of `lettre`'s tokio
//! transport. Building a [`SmtpMailer`] never opens a connection; the pool
//! connects lazily on the first send.

use std::sync::Arc;

use futures::future::BoxFuture;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

use murmur_core::config::{Config, SmtpConfig};
use murmur_core::notify::{Email, Mailer};
use murmur_core::TransportError;

/// Port where the server expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("invalid sender address {address:?}: {source}")]
    Sender {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to set up TLS for {host}: {source}")]
    Tls {
        host: String,
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let from: Mailbox = config.from.parse().map_err(|source| SmtpError::Sender {
            address: config.from.clone(),
            source,
        })?;

        let tls_params = TlsParameters::new(config.host.clone()).map_err(|source| SmtpError::Tls {
            host: config.host.clone(),
            source,
        })?;
        let tls = if config.port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .port(config.port)
            .tls(tls)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .timeout(Some(config.timeout))
            .build();

        debug!(host = %config.host, port = config.port, "smtp transport ready");
        Ok(Self { transport, from })
    }

    fn message(&self, email: Email) -> Result<Message, TransportError> {
        let to: Mailbox = email.to.parse().map_err(|e: lettre::address::AddressError| {
            TransportError::Address {
                address: email.to.clone(),
                reason: e.to_string(),
            }
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            let message = self.message(email)?;
            self.transport
                .send(message)
                .await
                .map(|_| ())
                .map_err(|e| TransportError::Send(e.to_string()))
        })
    }
}

/// Build the configured mailer, or `None` when SMTP is not set up.
pub fn from_config(config: &Config) -> Result<Option<Arc<dyn Mailer>>, SmtpError> {
    let Some(smtp) = config.smtp() else {
        info!("SMTP not configured, email notifications disabled");
        return Ok(None);
    };

    info!(host = %smtp.host, port = smtp.port, "email notifications enabled");
    Ok(Some(Arc::new(SmtpMailer::new(&smtp)?)))
}
