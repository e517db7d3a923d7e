//! Delete user command
//!
//! Removes a user. Controls owned by the user and requests they filed
//! stay behind with their references nulled out by the schema.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::users::models::{
    count_other_active_admins, fetch_user_for_update, owned_control_ids,
};

/// Command to delete a user by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserCommand {
    pub id: Uuid,
}

/// Response after deleting a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub id: Uuid,
    pub email: String,
    /// Controls that lost their owner through this deletion
    pub released_controls: Vec<Uuid>,
}

/// Errors that can occur when deleting a user
#[derive(Debug, thiserror::Error)]
pub enum DeleteUserError {
    #[error("User '{0}' not found")]
    NotFound(Uuid),

    #[error("User '{0}' is the last active admin")]
    LastActiveAdmin(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteUserResponse, DeleteUserError>> for DeleteUserCommand {}

impl crate::cqrs::middleware::Command for DeleteUserCommand {}

/// Handler function for deleting users
///
/// # Errors
///
/// - Not found error if the user does not exist
/// - Last admin error if the user is the only active admin
#[tracing::instrument(skip(pool), fields(user_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: DeleteUserCommand,
) -> Result<DeleteUserResponse, DeleteUserError> {
    let mut tx = pool.begin().await?;

    let user = fetch_user_for_update(&mut tx, command.id)
        .await?
        .ok_or(DeleteUserError::NotFound(command.id))?;

    if user.is_active_admin() {
        let others = count_other_active_admins(&mut tx, user.id).await?;
        if others == 0 {
            tracing::warn!(user_id = %user.id, "Rejected deleting the last active admin");
            return Err(DeleteUserError::LastActiveAdmin(user.id));
        }
    }

    let released_controls = owned_control_ids(&mut *tx, user.id).await?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        released = released_controls.len(),
        "User deleted successfully"
    );

    Ok(DeleteUserResponse {
        id: user.id,
        email: user.email,
        released_controls,
    })
}
