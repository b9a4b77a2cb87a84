//! Test builders: ergonomic constructors for records, documents and
//! requests.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request};
use chrono::{DateTime, Duration, TimeZone, Utc};
use murmur_core::types::DEFAULT_WIDGET_ID;
use murmur_core::{Document, FeedbackRecord};

// ---------------------------------------------------------------------------
// RecordBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`FeedbackRecord`] fixtures.
///
/// # Example
///
/// ```rust
/// let record = RecordBuilder::new("checkout is broken")
///     .page("/pricing")
///     .moderated(true)
///     .build();
/// ```
pub struct RecordBuilder {
    record: FeedbackRecord,
}

impl RecordBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            record: FeedbackRecord {
                id: uuid_like(message_seed()),
                message: message.into(),
                page: "/".to_string(),
                follow_up: None,
                widget_id: DEFAULT_WIDGET_ID.to_string(),
                timestamp: base_time(),
                source_address: "10.0.0.1".to_string(),
                user_agent: Some("harness/1.0".to_string()),
                moderated: false,
                archived: false,
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.record.id = id.into();
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.record.page = page.into();
        self
    }

    pub fn follow_up(mut self, follow_up: impl Into<String>) -> Self {
        self.record.follow_up = Some(follow_up.into());
        self
    }

    pub fn widget(mut self, widget_id: impl Into<String>) -> Self {
        self.record.widget_id = widget_id.into();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Timestamp `minutes` after [`base_time`].
    pub fn minute(self, minutes: i64) -> Self {
        self.at(base_time() + Duration::minutes(minutes))
    }

    pub fn moderated(mut self, moderated: bool) -> Self {
        self.record.moderated = moderated;
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.record.archived = archived;
        self
    }

    pub fn build(self) -> FeedbackRecord {
        self.record
    }
}

/// Fixed reference time all builder timestamps are relative to.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn message_seed() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn uuid_like(n: u64) -> String {
    format!("00000000-0000-4000-8000-{n:012x}")
}

/// Wrap records in a document with default settings.
pub fn document(records: impl IntoIterator<Item = FeedbackRecord>) -> Document {
    Document {
        feedback: records.into_iter().collect(),
        ..Document::default()
    }
}

// ---------------------------------------------------------------------------
// Corpus helpers
// ---------------------------------------------------------------------------

/// `n` records, one minute apart, alternating between three pages, every
/// third one moderated.
pub fn build_corpus(n: usize) -> Vec<FeedbackRecord> {
    (0..n)
        .map(|i| {
            RecordBuilder::new(format!("feedback {i}"))
                .id(format!("rec-{i:04}"))
                .page(format!("/page-{}", i % 3))
                .minute(i as i64)
                .moderated(i % 3 == 0)
                .build()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// JSON request with `body`.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Bodyless request.
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// `POST /api/feedback` with the given message and page.
pub fn submit_request(message: &str, page: &str) -> Request<Body> {
    json_request(
        Method::POST,
        "/api/feedback",
        serde_json::json!({ "message": message, "page": page }),
    )
}
