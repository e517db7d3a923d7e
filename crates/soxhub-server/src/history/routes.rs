//! History API routes
//!
//! Read-only access to the version history log. Entries are written by the
//! control and change request commands; nothing here mutates the log.
//!
//! # Route Structure
//!
//! - `GET /api/history` - Query the global history feed with filters

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::models::HistoryQuery;
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::error::AppError;

/// Creates the history router
pub fn history_routes() -> Router<PgPool> {
    Router::new().route("/", get(list_history))
}

/// Query the global history feed
///
/// # Endpoint
///
/// `GET /api/history?control_id=...&changed_by=...&start_time=...&end_time=...&limit=100&offset=0`
///
/// # Query Parameters
///
/// - `control_id` - Restrict to one control
/// - `changed_by` - Restrict to changes made by one user
/// - `start_time` - Entries at or after this time (RFC 3339)
/// - `end_time` - Entries at or before this time (RFC 3339)
/// - `limit` - Maximum entries to return (default: 100, max: 1000)
/// - `offset` - Entries to skip
///
/// # Response
///
/// - `200 OK` - Matching entries, newest first
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(
    skip(pool, query),
    fields(
        control_id = ?query.control_id,
        changed_by = ?query.changed_by,
        limit = query.limit,
        offset = query.offset
    )
)]
async fn list_history(
    State(pool): State<PgPool>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, HistoryApiError> {
    let limit = query.limit;
    let offset = query.offset;

    let entries = super::queries::query_history(&pool, query).await?;

    tracing::debug!(count = entries.len(), "History queried via API");

    let meta = json!({
        "count": entries.len(),
        "limit": limit,
        "offset": offset
    });

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(entries, meta))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for history API endpoints
#[derive(Debug)]
struct HistoryApiError(AppError);

impl From<AppError> for HistoryApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HistoryApiError {
    fn into_response(self) -> Response {
        // Only database failures reach this point
        tracing::error!("Database error during history query: {}", self.0);
        let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
    }
}
