//! Update control command
//!
//! Direct admin edit of a control. Applies a partial change set, writes the
//! row, and appends a version history entry with the field-level diff in
//! the same transaction. A change set whose values all equal the current
//! row is accepted but appends nothing.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::controls::changes::apply_changes;
use crate::features::controls::models::{
    fetch_control_for_update, ControlRecord, ControlResponse, CONTROL_COLUMNS,
};
use crate::features::shared::validation::{validate_name, NameValidationError, NAME_MAX_LENGTH};
use crate::history::{append_entry, NewVersionEntry};
use soxhub_common::types::ControlChanges;

/// Command to directly edit a control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateControlCommand {
    /// Target control, taken from the request path
    pub id: Uuid,

    /// Fields to change; absent fields keep their current values
    pub changes: ControlChanges,

    /// Acting user, taken from the request headers
    pub actor_id: Option<Uuid>,
}

/// Errors that can occur when updating a control
#[derive(Debug, thiserror::Error)]
pub enum UpdateControlError {
    #[error("At least one field must be provided")]
    NoFieldsToUpdate,

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Control '{0}' not found")]
    NotFound(Uuid),

    #[error("Owner '{0}' does not exist")]
    OwnerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ControlResponse, UpdateControlError>> for UpdateControlCommand {}

impl crate::cqrs::middleware::Command for UpdateControlCommand {}

impl UpdateControlCommand {
    /// Validates the command parameters
    #[tracing::instrument(skip(self), fields(control_id = %self.id))]
    pub fn validate(&self) -> Result<(), UpdateControlError> {
        if self.changes.is_empty() {
            return Err(UpdateControlError::NoFieldsToUpdate);
        }
        if let Some(name) = &self.changes.name {
            validate_name(name, NAME_MAX_LENGTH)?;
        }
        Ok(())
    }
}

/// Handler function for direct control edits
///
/// Locks the control row, applies the change set, and writes the row and
/// its history entry in one transaction.
#[tracing::instrument(skip(pool, command), fields(control_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: UpdateControlCommand,
) -> Result<ControlResponse, UpdateControlError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let mut control = fetch_control_for_update(&mut tx, command.id)
        .await?
        .ok_or(UpdateControlError::NotFound(command.id))?;

    let applied = apply_changes(&mut control, &command.changes);

    if applied.is_empty() {
        tx.commit().await?;
        tracing::info!(
            control_id = %control.id,
            "Change set matched current values; nothing to update"
        );
        return Ok(ControlResponse::from(control));
    }

    let control = write_control(&mut tx, &control).await.map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                if let Some(owner_id) = command.changes.owner_id {
                    return UpdateControlError::OwnerNotFound(owner_id);
                }
            }
        }
        UpdateControlError::Database(e)
    })?;

    let entry = NewVersionEntry::builder(control.id)
        .changed_by(command.actor_id)
        .summary(applied.summary())
        .previous_values(serde_json::Value::Object(applied.previous))
        .new_values(serde_json::Value::Object(applied.new))
        .build();
    append_entry(&mut *tx, entry).await?;

    tx.commit().await?;

    tracing::info!(
        control_id = %control.id,
        control_code = %control.code,
        "Control updated successfully"
    );

    Ok(ControlResponse::from(control))
}

/// Write the mutable columns of a control row from its in-memory state
pub(crate) async fn write_control(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    control: &ControlRecord,
) -> Result<ControlRecord, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE controls
        SET name = $1, description = $2, owner_id = $3, frequency = $4,
            control_type = $5, related_risks = $6, test_procedures = $7,
            evidence_requirements = $8, updated_at = NOW()
        WHERE id = $9
        RETURNING {}
        "#,
        CONTROL_COLUMNS
    );

    sqlx::query_as::<_, ControlRecord>(&sql)
        .bind(&control.name)
        .bind(&control.description)
        .bind(control.owner_id)
        .bind(&control.frequency)
        .bind(&control.control_type)
        .bind(&control.related_risks)
        .bind(&control.test_procedures)
        .bind(&control.evidence_requirements)
        .bind(control.id)
        .fetch_one(&mut **tx)
        .await
}
