//! User administration API routes
//!
//! # Route Structure
//!
//! - `POST /api/users` - Create a user
//! - `GET /api/users` - List with pagination and filters
//! - `GET /api/users/:id` - Get a single user by id
//! - `PUT /api/users/:id` - Update a user
//! - `DELETE /api/users/:id` - Delete a user

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{
    CreateUserCommand, CreateUserError, DeleteUserCommand, DeleteUserError, UpdateUserCommand,
    UpdateUserError,
};
use super::queries::{GetUserError, GetUserQuery, ListUsersError, ListUsersQuery};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the users router with all routes configured
pub fn users_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(create_user))
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id", put(update_user))
        .route("/:id", delete(delete_user))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a new user
///
/// # Endpoint
///
/// `POST /api/users`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Dana Admin",
///   "email": "dana@example.com",
///   "roles": ["admin"],
///   "active": true
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - User created
/// - `400 Bad Request` - Validation failed
/// - `409 Conflict` - Email already taken
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
async fn create_user(
    State(pool): State<PgPool>,
    Json(command): Json<CreateUserCommand>,
) -> Result<Response, UserApiError> {
    let response = super::commands::create::handle(pool, command).await?;

    tracing::info!(user_id = %response.id, "User created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Update an existing user
///
/// # Endpoint
///
/// `PUT /api/users/:id`
///
/// # Response
///
/// - `200 OK` - User updated
/// - `400 Bad Request` - Validation failed or empty body
/// - `404 Not Found` - User not found
/// - `409 Conflict` - Email taken, or the change would remove the last
///   active admin
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool, command), fields(user_id = %id))]
async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(mut command): Json<UpdateUserCommand>,
) -> Result<Response, UserApiError> {
    command.id = id;

    let response = super::commands::update::handle(pool, command).await?;

    tracing::info!(user_id = %response.id, "User updated via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Delete a user
///
/// # Endpoint
///
/// `DELETE /api/users/:id`
///
/// # Response
///
/// - `200 OK` - User deleted; owned controls are released
/// - `404 Not Found` - User not found
/// - `409 Conflict` - User is the last active admin
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(pool), fields(user_id = %id))]
async fn delete_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, UserApiError> {
    let response = super::commands::delete::handle(pool, DeleteUserCommand { id }).await?;

    tracing::info!(
        user_id = %response.id,
        released = response.released_controls.len(),
        "User deleted via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a single user by id
///
/// # Endpoint
///
/// `GET /api/users/:id`
///
/// The response includes the ids of the controls the user owns.
#[tracing::instrument(skip(pool), fields(user_id = %id))]
async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Response, UserApiError> {
    let query = GetUserQuery { id };

    let response = super::queries::get::handle(pool, query).await?;

    tracing::debug!(user_id = %response.id, "User retrieved via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List users with pagination and filters
///
/// # Endpoint
///
/// `GET /api/users?page=1&per_page=25&role=admin&active=true`
#[tracing::instrument(
    skip(pool, query),
    fields(page = ?query.page, per_page = ?query.per_page, role = ?query.role)
)]
async fn list_users(
    State(pool): State<PgPool>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Response, UserApiError> {
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Users listed via API"
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

/// Unified error type for user API endpoints
#[derive(Debug)]
enum UserApiError {
    CreateError(CreateUserError),
    UpdateError(UpdateUserError),
    DeleteError(DeleteUserError),
    GetError(GetUserError),
    ListError(ListUsersError),
}

impl From<CreateUserError> for UserApiError {
    fn from(err: CreateUserError) -> Self {
        Self::CreateError(err)
    }
}

impl From<UpdateUserError> for UserApiError {
    fn from(err: UpdateUserError) -> Self {
        Self::UpdateError(err)
    }
}

impl From<DeleteUserError> for UserApiError {
    fn from(err: DeleteUserError) -> Self {
        Self::DeleteError(err)
    }
}

impl From<GetUserError> for UserApiError {
    fn from(err: GetUserError) -> Self {
        Self::GetError(err)
    }
}

impl From<ListUsersError> for UserApiError {
    fn from(err: ListUsersError) -> Self {
        Self::ListError(err)
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> Response {
        match self {
            // Create errors
            UserApiError::CreateError(CreateUserError::NameValidation(_))
            | UserApiError::CreateError(CreateUserError::EmailValidation(_))
            | UserApiError::CreateError(CreateUserError::RoleSetValidation(_))
            | UserApiError::CreateError(CreateUserError::InvalidRole(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            UserApiError::CreateError(CreateUserError::DuplicateEmail(_)) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            UserApiError::CreateError(CreateUserError::Database(_)) => {
                tracing::error!("Database error during user creation: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Update errors
            UserApiError::UpdateError(UpdateUserError::NoFieldsToUpdate)
            | UserApiError::UpdateError(UpdateUserError::NameValidation(_))
            | UserApiError::UpdateError(UpdateUserError::EmailValidation(_))
            | UserApiError::UpdateError(UpdateUserError::RoleSetValidation(_))
            | UserApiError::UpdateError(UpdateUserError::InvalidRole(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            UserApiError::UpdateError(UpdateUserError::NotFound(id)) => {
                let error = ErrorResponse::new("NOT_FOUND", format!("User '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            UserApiError::UpdateError(UpdateUserError::DuplicateEmail(_))
            | UserApiError::UpdateError(UpdateUserError::LastActiveAdmin(_)) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            UserApiError::UpdateError(UpdateUserError::Database(_)) => {
                tracing::error!("Database error during user update: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Delete errors
            UserApiError::DeleteError(DeleteUserError::NotFound(id)) => {
                let error = ErrorResponse::new("NOT_FOUND", format!("User '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            UserApiError::DeleteError(DeleteUserError::LastActiveAdmin(_)) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            UserApiError::DeleteError(DeleteUserError::Database(_)) => {
                tracing::error!("Database error during user deletion: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Get errors
            UserApiError::GetError(GetUserError::NotFound(id)) => {
                let error = ErrorResponse::new("NOT_FOUND", format!("User '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            UserApiError::GetError(GetUserError::Database(_)) => {
                tracing::error!("Database error during user retrieval: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // List errors
            UserApiError::ListError(ListUsersError::InvalidPage)
            | UserApiError::ListError(ListUsersError::InvalidPerPage)
            | UserApiError::ListError(ListUsersError::InvalidRole(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            UserApiError::ListError(ListUsersError::Database(_)) => {
                tracing::error!("Database error during user listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for UserApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateError(e) => write!(f, "{}", e),
            Self::UpdateError(e) => write!(f, "{}", e),
            Self::DeleteError(e) => write!(f, "{}", e),
            Self::GetError(e) => write!(f, "{}", e),
            Self::ListError(e) => write!(f, "{}", e),
        }
    }
}
