//! Core types for murmur-core.
//!
//! This module defines the persisted data structures shared by every
//! service: the [`FeedbackRecord`], the global [`Settings`], and the
//! [`Document`] that holds both.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Widget tag used when a submission does not name one.
pub const DEFAULT_WIDGET_ID: &str = "default";

/// One stored anonymous submission.
///
/// Only `moderated` and `archived` change after creation; every other field
/// is written once by the intake service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub message: String,
    pub page: String,
    pub follow_up: Option<String>,
    #[serde(default = "default_widget_id")]
    pub widget_id: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Client address the submission came from. Older documents call it `ip`.
    #[serde(alias = "ip", default)]
    pub source_address: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub moderated: bool,
    #[serde(default)]
    pub archived: bool,
}

fn default_widget_id() -> String {
    DEFAULT_WIDGET_ID.to_string()
}

/// Global settings object. There is exactly one per store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// `settings.notifications`. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Keys the admin console stores alongside `email`; kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A new store starts with an empty address, which disables email.
impl Default for NotificationSettings {
    fn default() -> Self {
        Self::with_email("")
    }
}

impl NotificationSettings {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// The destination address, if email dispatch is enabled.
    pub fn address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// The whole persisted state: every record plus the settings object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
    #[serde(default)]
    pub settings: Settings,
}

impl Document {
    pub fn find(&self, id: &str) -> Option<&FeedbackRecord> {
        self.feedback.iter().find(|record| record.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut FeedbackRecord> {
        self.feedback.iter_mut().find(|record| record.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }
}

/// Format a timestamp the way records store it: RFC 3339, UTC, milliseconds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter writing `2024-01-15T10:00:00.000Z` and reading any RFC 3339.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
