//! murmur-core: anonymous feedback intake core library.
//!
//! This crate owns the persisted document and every service that touches
//! it. The HTTP layer in the `murmur` crate is a thin mapping onto these
//! services.
//!
//! # Architecture
//!
//! ```text
//! Intake ──► Store ◄── Moderation
//!    │         ▲
//!    │         └────── Settings
//!    └──► Dispatcher ──► Mailer (detached)
//! ```
//!
//! The [`Store`](store::Store) serializes every read-modify-write under a
//! single lock; services hold cheap clones of the same handle.

pub mod config;
pub mod error;
pub mod intake;
pub mod moderation;
pub mod notify;
pub mod ratelimit;
pub mod settings;
pub mod store;
pub mod types;

pub use error::{FeedbackError, StorageError, TransportError};
pub use types::{Document, FeedbackRecord, NotificationSettings, Settings};
