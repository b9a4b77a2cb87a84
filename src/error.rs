//! Request-boundary error mapping.
//!
//! Every handler returns [`ApiError`]; its [`IntoResponse`] impl picks the
//! status code and a `{"error": ...}` body. Storage failures are logged with
//! their detail and answered with a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use murmur_core::ratelimit::Quota;
use murmur_core::{FeedbackError, StorageError};

pub const RATE_LIMITED: &str = "Too many feedback submissions, please try again later.";
pub const NOT_FOUND: &str = "Feedback not found";
pub const INTERNAL: &str = "Internal server error";

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug)]
pub struct ApiError(pub FeedbackError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl From<FeedbackError> for ApiError {
    fn from(e: FeedbackError) -> Self {
        Self(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self(FeedbackError::Storage(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(FeedbackError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            FeedbackError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: &message })).into_response()
            }
            FeedbackError::RateLimited(quota) => {
                let mut headers = rate_limit_headers(&quota).to_vec();
                headers.push((
                    axum::http::header::RETRY_AFTER,
                    reset_secs(&quota).to_string(),
                ));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    axum::response::AppendHeaders(headers),
                    Json(ErrorBody {
                        error: RATE_LIMITED,
                    }),
                )
                    .into_response()
            }
            FeedbackError::NotFound(_) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error: NOT_FOUND })).into_response()
            }
            FeedbackError::Storage(e) => {
                error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody { error: INTERNAL }),
                )
                    .into_response()
            }
        }
    }
}

/// `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset` for `quota`.
pub fn rate_limit_headers(quota: &Quota) -> [(HeaderName, String); 3] {
    [
        (RATELIMIT_LIMIT, quota.limit.to_string()),
        (RATELIMIT_REMAINING, quota.remaining.to_string()),
        (RATELIMIT_RESET, reset_secs(quota).to_string()),
    ]
}

/// Whole seconds until a slot frees up, rounded up.
fn reset_secs(quota: &Quota) -> u64 {
    let reset = quota.reset_after;
    reset.as_secs() + u64::from(reset.subsec_nanos() > 0)
}
