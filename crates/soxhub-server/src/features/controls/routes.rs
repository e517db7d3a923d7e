//! Control API routes
//!
//! This module wires the CQRS commands and queries to Axum HTTP handlers,
//! providing a RESTful API for the control registry.
//!
//! # Route Structure
//!
//! - `POST /api/controls` - Create a new control
//! - `GET /api/controls` - List controls with pagination and filters
//! - `GET /api/controls/:id` - Get a single control by id
//! - `PUT /api/controls/:id` - Direct admin edit
//! - `POST /api/controls/:id/status` - Change lifecycle status
//! - `POST /api/controls/import` - Bulk import
//! - `GET /api/controls/:id/history` - Version history for one control

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{
    CreateControlCommand, CreateControlError, ImportControlsCommand, ImportControlsError,
    SetControlStatusCommand, SetControlStatusError, UpdateControlCommand, UpdateControlError,
};
use super::queries::{GetControlError, GetControlQuery, ListControlsError, ListControlsQuery};
use crate::error::AppError;
use crate::history::{self, HistoryQuery, DEFAULT_HISTORY_QUERY_LIMIT};
use crate::middleware::actor_from_headers;
use soxhub_common::types::ControlChanges;

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the controls router with all routes configured
pub fn controls_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(create_control))
        .route("/", get(list_controls))
        .route("/import", post(import_controls))
        .route("/:id", get(get_control))
        .route("/:id", put(update_control))
        .route("/:id/status", post(set_control_status))
        .route("/:id/history", get(control_history))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a new control
///
/// # Endpoint
///
/// `POST /api/controls`
///
/// # Response
///
/// - `201 Created` - Control created successfully
/// - `400 Bad Request` - Validation error
/// - `409 Conflict` - Control with code already exists
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(
    skip(pool, headers, command),
    fields(code = %command.code, name = %command.name)
)]
async fn create_control(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(mut command): Json<CreateControlCommand>,
) -> Result<Response, ControlApiError> {
    command.actor_id = actor_from_headers(&headers);

    let response = super::commands::create::handle(pool, command).await?;

    tracing::info!(
        control_id = %response.id,
        control_code = %response.code,
        "Control created via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Directly edit a control
///
/// # Endpoint
///
/// `PUT /api/controls/:id`
///
/// # Request Body
///
/// A partial change set; absent fields keep their current values. The
/// `status` field is not part of a change set and is rejected.
///
/// # Response
///
/// - `200 OK` - Control updated (or change set was a no-op)
/// - `400 Bad Request` - Validation error or empty change set
/// - `404 Not Found` - Control not found
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, changes), fields(control_id = %id))]
async fn update_control(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(changes): Json<ControlChanges>,
) -> Result<Response, ControlApiError> {
    let command = UpdateControlCommand {
        id,
        changes,
        actor_id: actor_from_headers(&headers),
    };

    let response = super::commands::update::handle(pool, command).await?;

    tracing::info!(
        control_id = %response.id,
        control_code = %response.code,
        "Control updated via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Change a control's lifecycle status
///
/// # Endpoint
///
/// `POST /api/controls/:id/status`
///
/// # Request Body
///
/// ```json
/// { "status": "inactive" }
/// ```
///
/// # Response
///
/// - `200 OK` - Status changed (or already had the requested status)
/// - `400 Bad Request` - Unknown status value
/// - `404 Not Found` - Control not found
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, command), fields(control_id = %id))]
async fn set_control_status(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(mut command): Json<SetControlStatusCommand>,
) -> Result<Response, ControlApiError> {
    command.id = id;
    command.actor_id = actor_from_headers(&headers);

    let response = super::commands::set_status::handle(pool, command).await?;

    tracing::info!(
        control_id = %response.id,
        status = %response.status,
        "Control status changed via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Bulk import controls
///
/// # Endpoint
///
/// `POST /api/controls/import`
///
/// # Request Body
///
/// ```json
/// { "controls": [ { "code": "FIN-001", "name": "...", ... } ] }
/// ```
///
/// # Response
///
/// - `201 Created` - Whole batch imported
/// - `400 Bad Request` - Any row invalid; nothing imported
/// - `409 Conflict` - A code already exists; nothing imported
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, headers, command), fields(rows = command.controls.len()))]
async fn import_controls(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    Json(mut command): Json<ImportControlsCommand>,
) -> Result<Response, ControlApiError> {
    command.actor_id = actor_from_headers(&headers);

    let response = super::commands::import::handle(pool, command).await?;

    tracing::info!(imported = response.imported, "Controls imported via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a single control by id
///
/// # Endpoint
///
/// `GET /api/controls/:id`
#[tracing::instrument(skip(pool), fields(control_id = %id))]
async fn get_control(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, ControlApiError> {
    let query = GetControlQuery { id };

    let response = super::queries::get::handle(pool, query).await?;

    tracing::debug!(control_id = %response.id, "Control retrieved via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List controls with pagination and filters
///
/// # Endpoint
///
/// `GET /api/controls?page=1&per_page=25&status=active&control_type=preventive&owner_id=...&q=bank`
#[tracing::instrument(
    skip(pool, query),
    fields(page = ?query.page, per_page = ?query.per_page, status = ?query.status)
)]
async fn list_controls(
    State(pool): State<PgPool>,
    Query(query): Query<ListControlsQuery>,
) -> Result<Response, ControlApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Controls listed via API"
    );

    let meta = json!({
        "pagination": response.pagination
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

/// Pagination parameters for the per-control history endpoint
#[derive(Debug, Deserialize)]
struct ControlHistoryParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Version history for one control
///
/// # Endpoint
///
/// `GET /api/controls/:id/history?limit=100&offset=0`
///
/// # Response
///
/// - `200 OK` - Entries for the control, newest first
/// - `404 Not Found` - Control not found
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, params), fields(control_id = %id))]
async fn control_history(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Query(params): Query<ControlHistoryParams>,
) -> Result<Response, ControlApiError> {
    // 404 for unknown controls rather than an empty list
    super::queries::get::handle(pool.clone(), GetControlQuery { id }).await?;

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_QUERY_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let query = HistoryQuery {
        control_id: Some(id),
        limit,
        offset,
        ..Default::default()
    };
    let entries = history::query_history(&pool, query).await?;

    tracing::debug!(count = entries.len(), "Control history retrieved via API");

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

/// Unified error type for control API endpoints
#[derive(Debug)]
enum ControlApiError {
    CreateError(CreateControlError),
    UpdateError(UpdateControlError),
    SetStatusError(SetControlStatusError),
    ImportError(ImportControlsError),
    GetError(GetControlError),
    ListError(ListControlsError),
    HistoryError(AppError),
}

impl From<CreateControlError> for ControlApiError {
    fn from(err: CreateControlError) -> Self {
        Self::CreateError(err)
    }
}

impl From<UpdateControlError> for ControlApiError {
    fn from(err: UpdateControlError) -> Self {
        Self::UpdateError(err)
    }
}

impl From<SetControlStatusError> for ControlApiError {
    fn from(err: SetControlStatusError) -> Self {
        Self::SetStatusError(err)
    }
}

impl From<ImportControlsError> for ControlApiError {
    fn from(err: ImportControlsError) -> Self {
        Self::ImportError(err)
    }
}

impl From<GetControlError> for ControlApiError {
    fn from(err: GetControlError) -> Self {
        Self::GetError(err)
    }
}

impl From<ListControlsError> for ControlApiError {
    fn from(err: ListControlsError) -> Self {
        Self::ListError(err)
    }
}

impl From<AppError> for ControlApiError {
    fn from(err: AppError) -> Self {
        Self::HistoryError(err)
    }
}

impl IntoResponse for ControlApiError {
    fn into_response(self) -> Response {
        match self {
            // Create errors
            ControlApiError::CreateError(CreateControlError::CodeValidation(_))
            | ControlApiError::CreateError(CreateControlError::NameValidation(_))
            | ControlApiError::CreateError(CreateControlError::InvalidFrequency(_))
            | ControlApiError::CreateError(CreateControlError::InvalidControlType(_))
            | ControlApiError::CreateError(CreateControlError::InvalidStatus(_))
            | ControlApiError::CreateError(CreateControlError::OwnerNotFound(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ControlApiError::CreateError(CreateControlError::DuplicateCode(code)) => {
                let error = ErrorResponse::new(
                    "CONFLICT",
                    format!("Control with code '{}' already exists", code),
                );
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            ControlApiError::CreateError(CreateControlError::Database(_)) => {
                tracing::error!("Database error during control creation: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Update errors
            ControlApiError::UpdateError(UpdateControlError::NoFieldsToUpdate)
            | ControlApiError::UpdateError(UpdateControlError::NameValidation(_))
            | ControlApiError::UpdateError(UpdateControlError::OwnerNotFound(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ControlApiError::UpdateError(UpdateControlError::NotFound(id)) => {
                let error =
                    ErrorResponse::new("NOT_FOUND", format!("Control '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ControlApiError::UpdateError(UpdateControlError::Database(_)) => {
                tracing::error!("Database error during control update: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Status change errors
            ControlApiError::SetStatusError(SetControlStatusError::InvalidStatus(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ControlApiError::SetStatusError(SetControlStatusError::NotFound(id)) => {
                let error =
                    ErrorResponse::new("NOT_FOUND", format!("Control '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ControlApiError::SetStatusError(SetControlStatusError::Database(_)) => {
                tracing::error!("Database error during status change: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Import errors
            ControlApiError::ImportError(ImportControlsError::EmptyBatch)
            | ControlApiError::ImportError(ImportControlsError::InvalidRow { .. })
            | ControlApiError::ImportError(ImportControlsError::DuplicateCodeInBatch { .. })
            | ControlApiError::ImportError(ImportControlsError::OwnerNotFound(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ControlApiError::ImportError(ImportControlsError::DuplicateCode(code)) => {
                let error = ErrorResponse::new(
                    "CONFLICT",
                    format!("Control with code '{}' already exists", code),
                );
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            ControlApiError::ImportError(ImportControlsError::Database(_)) => {
                tracing::error!("Database error during control import: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Get errors
            ControlApiError::GetError(GetControlError::NotFound(id)) => {
                let error =
                    ErrorResponse::new("NOT_FOUND", format!("Control '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ControlApiError::GetError(GetControlError::Database(_)) => {
                tracing::error!("Database error during control retrieval: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // List errors
            ControlApiError::ListError(ListControlsError::InvalidPage)
            | ControlApiError::ListError(ListControlsError::InvalidPerPage)
            | ControlApiError::ListError(ListControlsError::InvalidStatus(_))
            | ControlApiError::ListError(ListControlsError::InvalidControlType(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ControlApiError::ListError(ListControlsError::Database(_)) => {
                tracing::error!("Database error during control listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // History errors; only database failures reach this point
            ControlApiError::HistoryError(_) => {
                tracing::error!("Database error during history retrieval: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for ControlApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateError(e) => write!(f, "{}", e),
            Self::UpdateError(e) => write!(f, "{}", e),
            Self::SetStatusError(e) => write!(f, "{}", e),
            Self::ImportError(e) => write!(f, "{}", e),
            Self::GetError(e) => write!(f, "{}", e),
            Self::ListError(e) => write!(f, "{}", e),
            Self::HistoryError(e) => write!(f, "{}", e),
        }
    }
}
