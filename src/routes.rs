//! HTTP handlers. Each one parses the request, calls one service and shapes
//! the JSON answer.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header::USER_AGENT, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use murmur_core::intake::{Client, Submission};
use murmur_core::moderation::{ListQuery, ModerationPatch, DEFAULT_LIMIT};
use murmur_core::types::format_timestamp;
use murmur_core::{FeedbackError, FeedbackRecord, NotificationSettings, Settings};

use crate::error::{rate_limit_headers, ApiError};
use crate::state::AppState;

pub const SUBMITTED: &str = "Feedback submitted successfully";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body the widget posts to `POST /api/feedback`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub message: Option<String>,
    pub page: Option<String>,
    pub follow_up: Option<String>,
    pub widget_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub id: String,
    pub message: String,
}

/// Query string of `GET /api/feedback`. Kept as strings so bad values can
/// be answered with a JSON 400 instead of a bare rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub moderated: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub feedback: Vec<FeedbackRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerateRequest {
    pub moderated: Option<bool>,
    pub archived: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModerateResponse {
    pub success: bool,
    pub feedback: FeedbackRecord,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub notifications: Option<NotificationSettings>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

pub async fn submit_feedback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;

    let client = Client {
        address: peer.ip(),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|ua| ua.to_str().ok())
            .map(str::to_string),
    };
    let submission = Submission {
        message: request.message,
        page: request.page,
        follow_up: request.follow_up,
        widget_id: request.widget_id,
    };

    let accepted = state.intake.submit(submission, &client).await?;

    Ok((
        StatusCode::CREATED,
        rate_limit_headers(&accepted.quota),
        Json(SubmitResponse {
            success: true,
            id: accepted.record.id,
            message: SUBMITTED.to_string(),
        }),
    ))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let query = parse_list_params(params)?;
    let page = state.moderation.list(&query).await;

    Ok(Json(ListResponse {
        feedback: page.records,
        pagination: Pagination {
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more,
        },
    }))
}

pub async fn moderate_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ModerateResponse>, ApiError> {
    let request: ModerateRequest = optional_json(&body)?;
    let patch = ModerationPatch {
        moderated: request.moderated,
        archived: request.archived,
    };

    let feedback = state.moderation.moderate(&id, patch).await?;
    Ok(Json(ModerateResponse {
        success: true,
        feedback,
    }))
}

/// Parse a body whose fields are all optional. No body at all, or only
/// whitespace, reads as `T::default()`.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, FeedbackError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        FeedbackError::validation(format!("Failed to parse the request body as JSON: {e}"))
    })
}

/// Turn raw query parameters into a [`ListQuery`]. Anything that is not a
/// non-negative integer (`limit`, `offset`) or a boolean (`moderated`) is
/// rejected rather than clamped.
pub fn parse_list_params(params: ListParams) -> Result<ListQuery, FeedbackError> {
    let count = |name: &str, raw: Option<String>, default: usize| match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            FeedbackError::validation(format!("{name} must be a non-negative integer"))
        }),
    };

    let moderated = match params.moderated.as_deref().map(str::trim) {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => return Err(FeedbackError::validation("moderated must be true or false")),
    };

    Ok(ListQuery {
        page: params.page.filter(|p| !p.is_empty()),
        moderated,
        limit: count("limit", params.limit, DEFAULT_LIMIT)?,
        offset: count("offset", params.offset, 0)?,
    })
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.get().await)
}

pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<UpdateSettingsRequest>, JsonRejection>,
) -> Result<Json<UpdateSettingsResponse>, ApiError> {
    let Json(request) = body?;
    let notifications = request
        .notifications
        .ok_or_else(|| FeedbackError::validation("notifications required"))?;

    let settings = state.settings.update(notifications).await?;
    Ok(Json(UpdateSettingsResponse {
        success: true,
        settings,
    }))
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": format_timestamp(&chrono::Utc::now()),
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
