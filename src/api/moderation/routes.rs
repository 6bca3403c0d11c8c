// HTTP boundary for the moderation engine.
//
// Consumed synchronously by the post/comment/message services before they
// persist content, plus the read-only admin review surface. Callers are
// expected to coalesce rapid successive checks themselves (e.g. debounce
// keystroke-driven previews); the engine imposes no rate limit.

use crate::core::moderation::{
    ContentType, ModerationError, ModerationRecord, ModerationService, ModerationVerdict,
    RecordFilter, ReviewSummary, Severity, SubmissionContext,
};
use crate::infra::moderation::{QueueNotifier, SqliteModerationStore};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Largest admin review page the API will serve.
const MAX_RECORDS_PAGE: usize = 200;

/// The engine wired with its production adapters.
pub type Engine = ModerationService<SqliteModerationStore, SqliteModerationStore, QueueNotifier>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub author_id: u64,
    pub content: String,
    pub content_type: ContentType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub min_severity: Option<Severity>,
    pub since_hours: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub since_hours: Option<i64>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ModerationError> for ApiError {
    fn from(e: ModerationError) -> Self {
        match e {
            ModerationError::InvalidId | ModerationError::InvalidInput(_) => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Evaluate one submission. The caller resolves the authenticated identity
/// to `authorId`; a `shouldBlock: true` response means the caller must not
/// persist the content.
async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ModerationVerdict>, ApiError> {
    let ctx = SubmissionContext::new(request.author_id, request.content, request.content_type);
    let evaluation = state.engine.evaluate(&ctx).await?;
    Ok(Json(evaluation.verdict))
}

/// Recent moderation records for the admin review UI.
async fn recent_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Vec<ModerationRecord>>, ApiError> {
    let filter = RecordFilter {
        min_severity: query.min_severity,
        since: query.since_hours.map(|hours| Utc::now() - Duration::hours(hours)),
        limit: query.limit.unwrap_or(50).clamp(1, MAX_RECORDS_PAGE),
    };
    let records = state.engine.recent_records(filter).await?;
    Ok(Json(records))
}

/// Warning/block counts for the admin dashboard.
async fn review_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ReviewSummary>, ApiError> {
    let since = query.since_hours.map(|hours| Utc::now() - Duration::hours(hours));
    let summary = state.engine.review_summary(since).await?;
    Ok(Json(summary))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Evaluation boundary for content services
        .route("/api/moderation/evaluate", post(evaluate))
        // Admin review surface (read-only)
        .route("/api/moderation/records", get(recent_records))
        .route("/api/moderation/summary", get(review_summary))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
