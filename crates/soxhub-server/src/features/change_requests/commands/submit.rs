//! Submit change request command
//!
//! A control owner proposes changes to a control. The proposed change set
//! is stored as JSON and nothing touches the control until an admin
//! approves the request.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::change_requests::models::{
    ChangeRequestRecord, ChangeRequestResponse, CHANGE_REQUEST_COLUMNS,
};
use crate::features::controls::models::fetch_control;
use crate::features::shared::validation::{validate_name, NameValidationError, NAME_MAX_LENGTH};
use soxhub_common::types::ControlChanges;

/// Command to submit a change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitChangeRequestCommand {
    /// Target control
    pub control_id: Uuid,

    /// Proposed field changes; status is not a changeable field
    pub changes: ControlChanges,

    /// Optional note to the reviewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Requesting user, taken from the request headers
    #[serde(skip)]
    pub requester_id: Option<Uuid>,
}

/// Errors that can occur when submitting a change request
#[derive(Debug, thiserror::Error)]
pub enum SubmitChangeRequestError {
    #[error("Requester identity is required")]
    RequesterRequired,

    #[error("Proposed change set is empty")]
    EmptyChangeSet,

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Control '{0}' not found")]
    ControlNotFound(Uuid),

    #[error("Requester '{0}' does not exist")]
    RequesterNotFound(Uuid),

    #[error("Failed to encode change set: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ChangeRequestResponse, SubmitChangeRequestError>>
    for SubmitChangeRequestCommand
{
}

impl crate::cqrs::middleware::Command for SubmitChangeRequestCommand {}

impl SubmitChangeRequestCommand {
    /// Validates the command parameters
    #[tracing::instrument(skip(self), fields(control_id = %self.control_id))]
    pub fn validate(&self) -> Result<(), SubmitChangeRequestError> {
        if self.requester_id.is_none() {
            return Err(SubmitChangeRequestError::RequesterRequired);
        }
        if self.changes.is_empty() {
            return Err(SubmitChangeRequestError::EmptyChangeSet);
        }
        if let Some(name) = &self.changes.name {
            validate_name(name, NAME_MAX_LENGTH)?;
        }
        Ok(())
    }
}

/// Handler function for submitting change requests
///
/// # Errors
///
/// - Validation errors if the change set is empty or malformed
/// - Not-found errors if the target control or requester is missing
#[tracing::instrument(skip(pool, command), fields(control_id = %command.control_id))]
pub async fn handle(
    pool: PgPool,
    command: SubmitChangeRequestCommand,
) -> Result<ChangeRequestResponse, SubmitChangeRequestError> {
    command.validate()?;

    let requester_id = command
        .requester_id
        .ok_or(SubmitChangeRequestError::RequesterRequired)?;

    fetch_control(&pool, command.control_id)
        .await?
        .ok_or(SubmitChangeRequestError::ControlNotFound(command.control_id))?;

    let requester_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(requester_id)
            .fetch_one(&pool)
            .await?;
    if !requester_exists {
        return Err(SubmitChangeRequestError::RequesterNotFound(requester_id));
    }

    let proposed_changes = serde_json::to_value(&command.changes)?;

    let sql = format!(
        r#"
        INSERT INTO change_requests (control_id, requester_id, proposed_changes, request_comment)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        CHANGE_REQUEST_COLUMNS
    );

    let request = sqlx::query_as::<_, ChangeRequestRecord>(&sql)
        .bind(command.control_id)
        .bind(requester_id)
        .bind(&proposed_changes)
        .bind(command.comment.as_deref())
        .fetch_one(&pool)
        .await?;

    tracing::info!(
        request_id = %request.id,
        control_id = %request.control_id,
        requester_id = %requester_id,
        "Change request submitted"
    );

    Ok(ChangeRequestResponse::from(request))
}
