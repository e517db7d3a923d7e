//! Update user command
//!
//! Partial update of name, email, roles and the active flag. Refuses any
//! change that would leave the system without an active admin.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::validation::{
    normalize_roles, validate_email, validate_name, validate_roles, EmailValidationError,
    NameValidationError, RoleSetValidationError, NAME_MAX_LENGTH,
};
use crate::features::users::models::{
    count_other_active_admins, fetch_user_for_update, owned_control_ids, parse_roles, UserRecord,
    UserResponse, USER_COLUMNS,
};
use soxhub_common::types::Role;

/// Command to update an existing user
///
/// Absent fields keep their current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserCommand {
    /// Target user id, taken from the request path rather than the body
    #[serde(default)]
    pub id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Errors that can occur when updating a user
#[derive(Debug, thiserror::Error)]
pub enum UpdateUserError {
    #[error("At least one field must be provided")]
    NoFieldsToUpdate,

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Email validation failed: {0}")]
    EmailValidation(#[from] EmailValidationError),

    #[error("Role set validation failed: {0}")]
    RoleSetValidation(#[from] RoleSetValidationError),

    #[error("Unknown role '{0}'")]
    InvalidRole(String),

    #[error("User '{0}' not found")]
    NotFound(Uuid),

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("User '{0}' is the last active admin")]
    LastActiveAdmin(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UserResponse, UpdateUserError>> for UpdateUserCommand {}

impl crate::cqrs::middleware::Command for UpdateUserCommand {}

impl UpdateUserCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - At least one field must be present
    /// - Provided fields must pass the same checks as on create
    #[tracing::instrument(skip(self), fields(user_id = %self.id))]
    pub fn validate(&self) -> Result<(), UpdateUserError> {
        if self.name.is_none()
            && self.email.is_none()
            && self.roles.is_none()
            && self.active.is_none()
        {
            return Err(UpdateUserError::NoFieldsToUpdate);
        }

        if let Some(name) = &self.name {
            validate_name(name, NAME_MAX_LENGTH)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(raw) = &self.roles {
            let roles = parse_roles(raw).map_err(UpdateUserError::InvalidRole)?;
            validate_roles(&roles)?;
        }

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

/// Handler function for updating users
///
/// Locks the user row, checks the last-admin rule against the requested
/// role set and active flag, then writes the merged row.
///
/// # Errors
///
/// - Not found error if the user does not exist
/// - Last admin error if the change would demote or deactivate the only
///   active admin
/// - Duplicate error if the new email is already taken
#[tracing::instrument(skip(pool, command), fields(user_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: UpdateUserCommand,
) -> Result<UserResponse, UpdateUserError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let user = fetch_user_for_update(&mut tx, command.id)
        .await?
        .ok_or(UpdateUserError::NotFound(command.id))?;

    let roles: Vec<String> = match &command.roles {
        Some(raw) => {
            let parsed = parse_roles(raw).map_err(UpdateUserError::InvalidRole)?;
            normalize_roles(&parsed)
                .iter()
                .map(|role| role.as_str().to_string())
                .collect()
        }
        None => user.roles.clone(),
    };
    let active = command.active.unwrap_or(user.active);

    let keeps_admin = active && roles.iter().any(|r| r == Role::Admin.as_str());
    if user.is_active_admin() && !keeps_admin {
        let others = count_other_active_admins(&mut tx, user.id).await?;
        if others == 0 {
            tracing::warn!(user_id = %user.id, "Rejected update that would remove the last active admin");
            return Err(UpdateUserError::LastActiveAdmin(user.id));
        }
    }

    let name = command.name.as_deref().unwrap_or(&user.name);
    let email = command.email.as_deref().unwrap_or(&user.email);

    let sql = format!(
        r#"
        UPDATE users
        SET name = $1, email = $2, roles = $3, active = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING {}
        "#,
        USER_COLUMNS
    );

    let updated = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(name)
        .bind(email)
        .bind(&roles)
        .bind(active)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return UpdateUserError::DuplicateEmail(email.to_string());
                }
            }
            UpdateUserError::Database(e)
        })?;

    let owned_controls = owned_control_ids(&mut *tx, updated.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %updated.id, "User updated successfully");

    Ok(UserResponse {
        id: updated.id,
        name: updated.name,
        email: updated.email,
        roles: updated.roles,
        active: updated.active,
        owned_controls,
        created_at: updated.created_at,
        updated_at: updated.updated_at,
    })
}
