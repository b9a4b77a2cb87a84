//! Domain-specific assertion macros for murmur harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear *what* invariant was violated.

use murmur_core::FeedbackRecord;

/// Assert a [`TestResponse`](super::TestResponse) status, printing the body
/// on failure.
///
/// ```rust
/// assert_status!(response, StatusCode::CREATED);
/// ```
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {{
        let response = &$response;
        let expected: axum::http::StatusCode = $status;
        if response.status != expected {
            panic!(
                "assert_status! failed:\n  expected: {}\n  actual:   {}\n  body:     {}",
                expected, response.status, response.body
            );
        }
    }};
}

/// Assert a JSON error body `{"error": <message>}`.
#[macro_export]
macro_rules! assert_error_body {
    ($response:expr, $message:expr) => {{
        let response = &$response;
        pretty_assertions::assert_eq!(
            response.body,
            serde_json::json!({ "error": $message }),
            "unexpected error body for status {}",
            response.status
        );
    }};
}

/// Panic unless `records` are ordered newest first.
pub fn assert_newest_first(records: &[FeedbackRecord]) {
    for pair in records.windows(2) {
        if pair[0].timestamp < pair[1].timestamp {
            panic!(
                "records out of order: {} ({}) listed before newer {} ({})",
                pair[0].id, pair[0].timestamp, pair[1].id, pair[1].timestamp
            );
        }
    }
}

/// Ids of `records`, in order.
pub fn ids(records: &[FeedbackRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}
