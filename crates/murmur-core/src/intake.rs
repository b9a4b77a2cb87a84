//! Feedback intake: validate, rate-limit, store, notify.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::notify::Dispatcher;
use crate::ratelimit::{Quota, RateLimiter};
use crate::store::Store;
use crate::types::{FeedbackRecord, DEFAULT_WIDGET_ID};

pub const REQUIRED_FIELDS: &str = "message and page required";

/// Raw fields of a submission as the widget sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub message: Option<String>,
    pub page: Option<String>,
    pub follow_up: Option<String>,
    pub widget_id: Option<String>,
}

impl Submission {
    pub fn new(message: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            page: Some(page.into()),
            ..Self::default()
        }
    }

    pub fn follow_up(mut self, follow_up: impl Into<String>) -> Self {
        self.follow_up = Some(follow_up.into());
        self
    }

    pub fn widget_id(mut self, widget_id: impl Into<String>) -> Self {
        self.widget_id = Some(widget_id.into());
        self
    }
}

/// Request context captured for anti-abuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub address: IpAddr,
    pub user_agent: Option<String>,
}

impl Client {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            user_agent: None,
        }
    }
}

/// A stored submission and the submitter's remaining quota.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub record: FeedbackRecord,
    pub quota: Quota,
}

#[derive(Debug, Clone)]
pub struct IntakeService {
    store: Store,
    limiter: Arc<RateLimiter>,
    dispatcher: Dispatcher,
}

impl IntakeService {
    pub fn new(store: Store, limiter: Arc<RateLimiter>, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            limiter,
            dispatcher,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Validate and store one submission.
    ///
    /// Invalid submissions are rejected before they count against the
    /// client's quota. If the store cannot be flushed, or the call is dropped
    /// before the write lands, the quota slot is handed back. `message` is
    /// stored trimmed and `page` exactly as sent. Notification runs detached
    /// once the record is durable.
    pub async fn submit(&self, submission: Submission, client: &Client) -> Result<Accepted, FeedbackError> {
        let message = non_blank(submission.message.as_deref()).map(str::to_string);
        let page = submission.page.filter(|page| !page.trim().is_empty());
        let (Some(message), Some(page)) = (message, page) else {
            return Err(FeedbackError::validation(REQUIRED_FIELDS));
        };

        let slot = self.limiter.reserve(client.address).map_err(|quota| {
            warn!(
                address = %client.address,
                reset_after_secs = quota.reset_after.as_secs(),
                "feedback rate limit exceeded"
            );
            FeedbackError::RateLimited(quota)
        })?;

        let mut record = FeedbackRecord {
            id: String::new(),
            message,
            page,
            follow_up: non_blank(submission.follow_up.as_deref()).map(str::to_string),
            widget_id: non_blank(submission.widget_id.as_deref())
                .unwrap_or(DEFAULT_WIDGET_ID)
                .to_string(),
            timestamp: Utc::now().trunc_subsecs(3),
            source_address: client.address.to_string(),
            user_agent: client.user_agent.clone(),
            moderated: false,
            archived: false,
        };

        // Dropping `slot` before the commit below hands it back, whether the
        // write fails or this future is cancelled mid-write.
        let (record, notify_to) = self
            .store
            .mutate(|doc| {
                record.id = loop {
                    let id = Uuid::new_v4().to_string();
                    if !doc.contains(&id) {
                        break id;
                    }
                };
                doc.feedback.push(record.clone());
                let notify_to = doc.settings.notifications.address().map(str::to_string);
                Ok::<_, FeedbackError>((record, notify_to))
            })
            .await?;
        let quota = slot.commit();

        info!(
            id = %record.id,
            widget = %record.widget_id,
            page = %record.page,
            "feedback stored"
        );

        if let Some(to) = notify_to {
            self.dispatcher.notify(&record, &to);
        }

        Ok(Accepted { record, quota })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
