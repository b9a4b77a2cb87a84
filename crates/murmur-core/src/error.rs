//! Error taxonomy shared by the store and the services.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ratelimit::Quota;

/// Failure to load or flush the persisted document.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document at {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store I/O on {path} timed out after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },
}

/// Errors a service operation can hand back to the request boundary.
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("{0}")]
    Validation(String),

    #[error("rate limit exceeded")]
    RateLimited(Quota),

    #[error("feedback {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FeedbackError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Notification delivery failure. Logged by the dispatcher, never returned
/// to a caller of the intake service.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid mail address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("mail transport failed: {0}")]
    Send(String),

    #[error("mail transport timed out after {0:?}")]
    Timeout(Duration),
}
