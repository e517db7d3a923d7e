//! Create user command
//!
//! Inserts a new user with a validated, deduplicated role set.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::validation::{
    normalize_roles, validate_email, validate_name, validate_roles, EmailValidationError,
    NameValidationError, RoleSetValidationError, NAME_MAX_LENGTH,
};
use crate::features::users::models::{parse_roles, UserRecord, UserResponse, USER_COLUMNS};

fn default_active() -> bool {
    true
}

/// Command to create a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    /// Display name of the user
    pub name: String,

    /// Unique email address
    pub email: String,

    /// Role set, e.g. `["admin"]` or `["control-owner"]`
    pub roles: Vec<String>,

    /// Whether the account starts active; defaults to true
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Errors that can occur when creating a user
#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Email validation failed: {0}")]
    EmailValidation(#[from] EmailValidationError),

    #[error("Role set validation failed: {0}")]
    RoleSetValidation(#[from] RoleSetValidationError),

    #[error("Unknown role '{0}'")]
    InvalidRole(String),

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UserResponse, CreateUserError>> for CreateUserCommand {}

impl crate::cqrs::middleware::Command for CreateUserCommand {}

impl CreateUserCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - Name must be 1-256 characters
    /// - Email must be a plausible address
    /// - Roles must contain at least one known role value
    #[tracing::instrument(skip(self), fields(email = %self.email))]
    pub fn validate(&self) -> Result<(), CreateUserError> {
        validate_name(&self.name, NAME_MAX_LENGTH)?;
        validate_email(&self.email)?;

        let roles = parse_roles(&self.roles).map_err(CreateUserError::InvalidRole)?;
        validate_roles(&roles)?;

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

/// Handler function for creating users
///
/// # Errors
///
/// - Validation errors if command parameters are invalid
/// - Duplicate error if a user with the same email exists
#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
pub async fn handle(
    pool: PgPool,
    command: CreateUserCommand,
) -> Result<UserResponse, CreateUserError> {
    command.validate()?;

    tracing::info!("Creating user");

    let roles = parse_roles(&command.roles).map_err(CreateUserError::InvalidRole)?;
    let roles: Vec<String> = normalize_roles(&roles)
        .iter()
        .map(|role| role.as_str().to_string())
        .collect();

    let sql = format!(
        r#"
        INSERT INTO users (name, email, roles, active)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        USER_COLUMNS
    );

    let user = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(&command.name)
        .bind(&command.email)
        .bind(&roles)
        .bind(command.active)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return CreateUserError::DuplicateEmail(command.email.clone());
                }
            }
            CreateUserError::Database(e)
        })?;

    tracing::info!(user_id = %user.id, "User created successfully");

    Ok(UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        roles: user.roles,
        active: user.active,
        owned_controls: Vec::new(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}
