//! Set control status command
//!
//! The deactivation and reactivation path. Controls are never hard-deleted;
//! retiring one means setting its status to `inactive`.

use mediator::Request;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::controls::models::{
    fetch_control_for_update, ControlRecord, ControlResponse, CONTROL_COLUMNS,
};
use crate::history::{append_entry, NewVersionEntry};
use soxhub_common::types::ControlStatus;

/// Command to change a control's lifecycle status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetControlStatusCommand {
    /// Target control, taken from the request path
    #[serde(default)]
    pub id: Uuid,

    /// New status value
    pub status: String,

    /// Acting user, taken from the request headers
    #[serde(skip)]
    pub actor_id: Option<Uuid>,
}

/// Errors that can occur when changing a control's status
#[derive(Debug, thiserror::Error)]
pub enum SetControlStatusError {
    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Control '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ControlResponse, SetControlStatusError>> for SetControlStatusCommand {}

impl crate::cqrs::middleware::Command for SetControlStatusCommand {}

impl SetControlStatusCommand {
    /// Validates the command parameters
    #[tracing::instrument(skip(self), fields(control_id = %self.id, status = %self.status))]
    pub fn validate(&self) -> Result<(), SetControlStatusError> {
        self.status
            .parse::<ControlStatus>()
            .map_err(|_| SetControlStatusError::InvalidStatus(self.status.clone()))?;
        Ok(())
    }
}

/// Handler function for status changes
///
/// Writes the status and its history entry in one transaction. Setting the
/// status a control already has is accepted but appends nothing.
#[tracing::instrument(
    skip(pool, command),
    fields(control_id = %command.id, status = %command.status)
)]
pub async fn handle(
    pool: PgPool,
    command: SetControlStatusCommand,
) -> Result<ControlResponse, SetControlStatusError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let control = fetch_control_for_update(&mut tx, command.id)
        .await?
        .ok_or(SetControlStatusError::NotFound(command.id))?;

    if control.status == command.status {
        tx.commit().await?;
        tracing::info!(
            control_id = %control.id,
            "Control already has requested status; nothing to do"
        );
        return Ok(ControlResponse::from(control));
    }

    let previous_status = control.status.clone();

    let sql = format!(
        r#"
        UPDATE controls
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING {}
        "#,
        CONTROL_COLUMNS
    );

    let control = sqlx::query_as::<_, ControlRecord>(&sql)
        .bind(&command.status)
        .bind(command.id)
        .fetch_one(&mut *tx)
        .await?;

    let entry = NewVersionEntry::builder(control.id)
        .changed_by(command.actor_id)
        .summary(format!(
            "Status changed from {} to {}",
            previous_status, control.status
        ))
        .previous_values(json!({ "status": previous_status }))
        .new_values(json!({ "status": control.status }))
        .build();
    append_entry(&mut *tx, entry).await?;

    tx.commit().await?;

    tracing::info!(
        control_id = %control.id,
        control_code = %control.code,
        status = %control.status,
        "Control status changed"
    );

    Ok(ControlResponse::from(control))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestControl, TestUser};
    use crate::history::get_control_history;

    #[test]
    fn test_validation_rejects_unknown_status() {
        let cmd = SetControlStatusCommand {
            id: Uuid::new_v4(),
            status: "retired".to_string(),
            actor_id: None,
        };
        assert!(matches!(
            cmd.validate(),
            Err(SetControlStatusError::InvalidStatus(_))
        ));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_deactivates_control(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;

        let cmd = SetControlStatusCommand {
            id: control.id,
            status: "inactive".to_string(),
            actor_id: Some(admin.id),
        };

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.status, "inactive");

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary, "Status changed from active to inactive");
        assert_eq!(history[0].previous_values["status"], "active");
        assert_eq!(history[0].new_values["status"], "inactive");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_same_status_appends_nothing(pool: PgPool) -> sqlx::Result<()> {
        let control = TestControl::new("FIN-002", "Journal entry review")
            .insert(&pool)
            .await?;

        let cmd = SetControlStatusCommand {
            id: control.id,
            status: "active".to_string(),
            actor_id: None,
        };

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.status, "active");

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert!(history.is_empty());

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_not_found(pool: PgPool) -> sqlx::Result<()> {
        let cmd = SetControlStatusCommand {
            id: Uuid::new_v4(),
            status: "inactive".to_string(),
            actor_id: None,
        };

        let result = handle(pool.clone(), cmd).await;
        assert!(matches!(result, Err(SetControlStatusError::NotFound(_))));

        Ok(())
    }
}
