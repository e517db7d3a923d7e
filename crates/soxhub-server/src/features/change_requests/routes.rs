//! Change request API routes
//!
//! # Route Structure
//!
//! - `POST /api/change-requests` - Submit a change request
//! - `GET /api/change-requests` - List with pagination and filters
//! - `GET /api/change-requests/:id` - Get a single request by id
//! - `POST /api/change-requests/:id/approve` - Approve (admin)
//! - `POST /api/change-requests/:id/reject` - Reject (admin)

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{
    DecideChangeRequestCommand, DecideChangeRequestError, Decision, SubmitChangeRequestCommand,
    SubmitChangeRequestError,
};
use super::queries::{
    GetChangeRequestError, GetChangeRequestQuery, ListChangeRequestsError, ListChangeRequestsQuery,
};
use crate::middleware::actor_from_headers;

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the change requests router with all routes configured
pub fn change_requests_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(submit_change_request))
        .route("/", get(list_change_requests))
        .route("/:id", get(get_change_request))
        .route("/:id/approve", post(approve_change_request))
        .route("/:id/reject", post(reject_change_request))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Submit a change request
///
/// # Endpoint
///
/// `POST /api/change-requests`
///
/// # Request Body
///
/// ```json
/// {
///   "control_id": "...",
///   "changes": { "name": "New name" },
///   "comment": "Please review"
/// }
/// ```
///
/// The requester is taken from the `x-user-id` header.
///
/// # Response
///
/// - `201 Created` - Request submitted
/// - `400 Bad Request` - Empty change set or missing requester
/// - `404 Not Found` - Target control not found
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, command), fields(control_id = %command.control_id))]
async fn submit_change_request(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(mut command): Json<SubmitChangeRequestCommand>,
) -> Result<Response, ChangeRequestApiError> {
    command.requester_id = actor_from_headers(&headers);

    let response = super::commands::submit::handle(pool, command).await?;

    tracing::info!(
        request_id = %response.id,
        control_id = %response.control_id,
        "Change request submitted via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Optional body for decision endpoints
#[derive(Debug, Default, Deserialize)]
struct DecisionBody {
    comment: Option<String>,
}

/// Approve a pending change request
///
/// # Endpoint
///
/// `POST /api/change-requests/:id/approve`
///
/// # Response
///
/// - `200 OK` - Request approved and changes applied
/// - `403 Forbidden` - Reviewer is not an active admin
/// - `404 Not Found` - Request not found
/// - `409 Conflict` - Request was already decided
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, body), fields(request_id = %id))]
async fn approve_change_request(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> Result<Response, ChangeRequestApiError> {
    decide(pool, id, Decision::Approve, headers, body).await
}

/// Reject a pending change request
///
/// # Endpoint
///
/// `POST /api/change-requests/:id/reject`
///
/// # Response
///
/// Same as approval; the target control is not touched.
#[tracing::instrument(skip(pool, headers, body), fields(request_id = %id))]
async fn reject_change_request(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> Result<Response, ChangeRequestApiError> {
    decide(pool, id, Decision::Reject, headers, body).await
}

async fn decide(
    pool: PgPool,
    id: Uuid,
    decision: Decision,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> Result<Response, ChangeRequestApiError> {
    let comment = body.and_then(|Json(b)| b.comment);

    let command = DecideChangeRequestCommand {
        request_id: id,
        decision,
        comment,
        reviewer_id: actor_from_headers(&headers),
    };

    let response = super::commands::decide::handle(pool, command).await?;

    tracing::info!(
        request_id = %response.id,
        status = %response.status,
        "Change request decided via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a single change request by id
///
/// # Endpoint
///
/// `GET /api/change-requests/:id`
#[tracing::instrument(skip(pool), fields(request_id = %id))]
async fn get_change_request(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, ChangeRequestApiError> {
    let query = GetChangeRequestQuery { id };

    let response = super::queries::get::handle(pool, query).await?;

    tracing::debug!(request_id = %response.id, "Change request retrieved via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List change requests with pagination and filters
///
/// # Endpoint
///
/// `GET /api/change-requests?page=1&per_page=25&status=pending&control_id=...`
#[tracing::instrument(
    skip(pool, query),
    fields(page = ?query.page, per_page = ?query.per_page, status = ?query.status)
)]
async fn list_change_requests(
    State(pool): State<PgPool>,
    Query(query): Query<ListChangeRequestsQuery>,
) -> Result<Response, ChangeRequestApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Change requests listed via API"
    );

    let meta = json!({
        "pagination": response.pagination
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for change request API endpoints
#[derive(Debug)]
enum ChangeRequestApiError {
    SubmitError(SubmitChangeRequestError),
    DecideError(DecideChangeRequestError),
    GetError(GetChangeRequestError),
    ListError(ListChangeRequestsError),
}

impl From<SubmitChangeRequestError> for ChangeRequestApiError {
    fn from(err: SubmitChangeRequestError) -> Self {
        Self::SubmitError(err)
    }
}

impl From<DecideChangeRequestError> for ChangeRequestApiError {
    fn from(err: DecideChangeRequestError) -> Self {
        Self::DecideError(err)
    }
}

impl From<GetChangeRequestError> for ChangeRequestApiError {
    fn from(err: GetChangeRequestError) -> Self {
        Self::GetError(err)
    }
}

impl From<ListChangeRequestsError> for ChangeRequestApiError {
    fn from(err: ListChangeRequestsError) -> Self {
        Self::ListError(err)
    }
}

impl IntoResponse for ChangeRequestApiError {
    fn into_response(self) -> Response {
        match self {
            // Submit errors
            ChangeRequestApiError::SubmitError(SubmitChangeRequestError::RequesterRequired)
            | ChangeRequestApiError::SubmitError(SubmitChangeRequestError::EmptyChangeSet)
            | ChangeRequestApiError::SubmitError(SubmitChangeRequestError::NameValidation(_))
            | ChangeRequestApiError::SubmitError(SubmitChangeRequestError::RequesterNotFound(
                _,
            )) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ChangeRequestApiError::SubmitError(SubmitChangeRequestError::ControlNotFound(id)) => {
                let error =
                    ErrorResponse::new("NOT_FOUND", format!("Control '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ChangeRequestApiError::SubmitError(SubmitChangeRequestError::Encode(_))
            | ChangeRequestApiError::SubmitError(SubmitChangeRequestError::Database(_)) => {
                tracing::error!("Error during change request submission: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Decide errors
            ChangeRequestApiError::DecideError(DecideChangeRequestError::ReviewerRequired)
            | ChangeRequestApiError::DecideError(DecideChangeRequestError::OwnerNotFound(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ChangeRequestApiError::DecideError(DecideChangeRequestError::NotFound(id)) => {
                let error = ErrorResponse::new(
                    "NOT_FOUND",
                    format!("Change request '{}' not found", id),
                );
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ChangeRequestApiError::DecideError(DecideChangeRequestError::AlreadyDecided {
                ..
            }) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            ChangeRequestApiError::DecideError(DecideChangeRequestError::ReviewerNotFound(_))
            | ChangeRequestApiError::DecideError(DecideChangeRequestError::ReviewerNotAdmin(
                _,
            )) => {
                let error = ErrorResponse::new("FORBIDDEN", self.to_string());
                (StatusCode::FORBIDDEN, Json(error)).into_response()
            },
            ChangeRequestApiError::DecideError(DecideChangeRequestError::ControlMissing(_))
            | ChangeRequestApiError::DecideError(DecideChangeRequestError::Decode(_))
            | ChangeRequestApiError::DecideError(DecideChangeRequestError::Database(_)) => {
                tracing::error!("Error during change request decision: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Get errors
            ChangeRequestApiError::GetError(GetChangeRequestError::NotFound(id)) => {
                let error = ErrorResponse::new(
                    "NOT_FOUND",
                    format!("Change request '{}' not found", id),
                );
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ChangeRequestApiError::GetError(GetChangeRequestError::Database(_)) => {
                tracing::error!("Database error during change request retrieval: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // List errors
            ChangeRequestApiError::ListError(ListChangeRequestsError::InvalidPage)
            | ChangeRequestApiError::ListError(ListChangeRequestsError::InvalidPerPage)
            | ChangeRequestApiError::ListError(ListChangeRequestsError::InvalidStatus(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ChangeRequestApiError::ListError(ListChangeRequestsError::Database(_)) => {
                tracing::error!("Database error during change request listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for ChangeRequestApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmitError(e) => write!(f, "{}", e),
            Self::DecideError(e) => write!(f, "{}", e),
            Self::GetError(e) => write!(f, "{}", e),
            Self::ListError(e) => write!(f, "{}", e),
        }
    }
}
