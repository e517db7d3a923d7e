//! Decide change request command
//!
//! Approval and rejection share one handler. The whole decision runs in a
//! single transaction with the request row locked, so two concurrent
//! decisions on one request serialize and the loser observes the decided
//! status. Approval applies the proposed changes to the target control and
//! appends the version history entry before marking the request; rejection
//! only marks the request.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::change_requests::models::{
    fetch_request_for_update, ChangeRequestRecord, ChangeRequestResponse, CHANGE_REQUEST_COLUMNS,
};
use crate::features::controls::changes::apply_changes;
use crate::features::controls::commands::update::write_control;
use crate::features::controls::models::fetch_control_for_update;
use crate::history::{append_entry, NewVersionEntry};
use soxhub_common::types::{ControlChanges, Role};

/// The two possible decisions on a pending change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// The request status this decision results in
    pub fn as_status(&self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        }
    }
}

/// Command to approve or reject a pending change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideChangeRequestCommand {
    /// Target request, taken from the request path
    pub request_id: Uuid,

    pub decision: Decision,

    /// Optional note from the reviewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Reviewing user, taken from the request headers
    #[serde(skip)]
    pub reviewer_id: Option<Uuid>,
}

/// Errors that can occur when deciding a change request
#[derive(Debug, thiserror::Error)]
pub enum DecideChangeRequestError {
    #[error("Reviewer identity is required")]
    ReviewerRequired,

    #[error("Change request '{0}' not found")]
    NotFound(Uuid),

    #[error("Change request '{id}' was already {status}")]
    AlreadyDecided { id: Uuid, status: String },

    #[error("Reviewer '{0}' does not exist")]
    ReviewerNotFound(Uuid),

    #[error("Reviewer '{0}' is not an active admin")]
    ReviewerNotAdmin(Uuid),

    #[error("Control '{0}' referenced by the request is missing")]
    ControlMissing(Uuid),

    #[error("Proposed owner '{0}' does not exist")]
    OwnerNotFound(Uuid),

    #[error("Stored change set could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ChangeRequestResponse, DecideChangeRequestError>>
    for DecideChangeRequestCommand
{
}

impl crate::cqrs::middleware::Command for DecideChangeRequestCommand {}

impl DecideChangeRequestCommand {
    /// Validates the command parameters
    #[tracing::instrument(skip(self), fields(request_id = %self.request_id, decision = ?self.decision))]
    pub fn validate(&self) -> Result<(), DecideChangeRequestError> {
        if self.reviewer_id.is_none() {
            return Err(DecideChangeRequestError::ReviewerRequired);
        }
        Ok(())
    }
}

/// Handler function for change request decisions
///
/// # Errors
///
/// - Conflict if the request was already decided
/// - Authorization error if the reviewer is not an active admin
/// - Not-found errors for unknown requests
#[tracing::instrument(
    skip(pool, command),
    fields(request_id = %command.request_id, decision = ?command.decision)
)]
pub async fn handle(
    pool: PgPool,
    command: DecideChangeRequestCommand,
) -> Result<ChangeRequestResponse, DecideChangeRequestError> {
    command.validate()?;

    let reviewer_id = command
        .reviewer_id
        .ok_or(DecideChangeRequestError::ReviewerRequired)?;

    let mut tx = pool.begin().await?;

    // Lock the request row; a concurrent decision waits here and then
    // sees the updated status
    let request = fetch_request_for_update(&mut tx, command.request_id)
        .await?
        .ok_or(DecideChangeRequestError::NotFound(command.request_id))?;

    if request.status != "pending" {
        return Err(DecideChangeRequestError::AlreadyDecided {
            id: request.id,
            status: request.status,
        });
    }

    verify_reviewer(&mut tx, reviewer_id).await?;

    if command.decision == Decision::Approve {
        apply_request(&mut tx, &request, reviewer_id).await?;
    }

    let sql = format!(
        r#"
        UPDATE change_requests
        SET status = $1, reviewer_id = $2, reviewed_at = NOW(), review_comment = $3
        WHERE id = $4
        RETURNING {}
        "#,
        CHANGE_REQUEST_COLUMNS
    );

    let request = sqlx::query_as::<_, ChangeRequestRecord>(&sql)
        .bind(command.decision.as_status())
        .bind(reviewer_id)
        .bind(command.comment.as_deref())
        .bind(command.request_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %request.id,
        control_id = %request.control_id,
        status = %request.status,
        reviewer_id = %reviewer_id,
        "Change request decided"
    );

    Ok(ChangeRequestResponse::from(request))
}

/// Verify the reviewer exists, is active, and holds the admin role
async fn verify_reviewer(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    reviewer_id: Uuid,
) -> Result<(), DecideChangeRequestError> {
    let reviewer = sqlx::query_as::<_, (Vec<String>, bool)>(
        "SELECT roles, active FROM users WHERE id = $1",
    )
    .bind(reviewer_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(DecideChangeRequestError::ReviewerNotFound(reviewer_id))?;

    let (roles, active) = reviewer;
    if !active || !roles.iter().any(|r| r == Role::Admin.as_str()) {
        return Err(DecideChangeRequestError::ReviewerNotAdmin(reviewer_id));
    }

    Ok(())
}

/// Apply an approved request's changes to its control and append the
/// history entry, inside the caller's transaction
async fn apply_request(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request: &ChangeRequestRecord,
    reviewer_id: Uuid,
) -> Result<(), DecideChangeRequestError> {
    let changes: ControlChanges = serde_json::from_value(request.proposed_changes.clone())?;

    let mut control = fetch_control_for_update(tx, request.control_id)
        .await?
        .ok_or(DecideChangeRequestError::ControlMissing(request.control_id))?;

    let applied = apply_changes(&mut control, &changes);

    if applied.is_empty() {
        tracing::info!(
            request_id = %request.id,
            control_id = %control.id,
            "Proposed changes match current values; control untouched"
        );
        return Ok(());
    }

    write_control(tx, &control).await.map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                if let Some(owner_id) = changes.owner_id {
                    return DecideChangeRequestError::OwnerNotFound(owner_id);
                }
            }
        }
        DecideChangeRequestError::Database(e)
    })?;

    let entry = NewVersionEntry::builder(control.id)
        .changed_by(Some(reviewer_id))
        .summary(applied.summary())
        .previous_values(serde_json::Value::Object(applied.previous))
        .new_values(serde_json::Value::Object(applied.new))
        .build();
    append_entry(&mut **tx, entry).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestChangeRequest, TestControl, TestUser};
    use crate::history::get_control_history;
    use serde_json::json;

    #[test]
    fn test_validation_requires_reviewer() {
        let cmd = DecideChangeRequestCommand {
            request_id: Uuid::new_v4(),
            decision: Decision::Approve,
            comment: None,
            reviewer_id: None,
        };
        assert!(matches!(
            cmd.validate(),
            Err(DecideChangeRequestError::ReviewerRequired)
        ));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_approve_applies_changes_and_appends_history(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .with_changes(json!({ "name": "Daily bank reconciliation" }))
            .insert(&pool)
            .await?;

        let cmd = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Approve,
            comment: Some("Looks good".to_string()),
            reviewer_id: Some(admin.id),
        };

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.status, "approved");
        assert_eq!(response.reviewer_id, Some(admin.id));
        assert!(response.reviewed_at.is_some());
        assert_eq!(response.review_comment.as_deref(), Some("Looks good"));

        let name = sqlx::query_scalar::<_, String>("SELECT name FROM controls WHERE id = $1")
            .bind(control.id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(name, "Daily bank reconciliation");

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary, "Updated name");
        assert_eq!(history[0].changed_by, Some(admin.id));
        assert_eq!(history[0].previous_values["name"], "Bank reconciliation");
        assert_eq!(history[0].new_values["name"], "Daily bank reconciliation");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_reject_leaves_control_untouched(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .with_changes(json!({ "name": "Daily bank reconciliation" }))
            .insert(&pool)
            .await?;

        let cmd = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Reject,
            comment: Some("Out of scope".to_string()),
            reviewer_id: Some(admin.id),
        };

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.status, "rejected");
        assert_eq!(response.review_comment.as_deref(), Some("Out of scope"));

        let name = sqlx::query_scalar::<_, String>("SELECT name FROM controls WHERE id = $1")
            .bind(control.id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(name, "Bank reconciliation");

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert!(history.is_empty());

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_second_decision_conflicts(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .insert(&pool)
            .await?;

        let approve = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Approve,
            comment: None,
            reviewer_id: Some(admin.id),
        };
        handle(pool.clone(), approve)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let reject = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Reject,
            comment: None,
            reviewer_id: Some(admin.id),
        };
        let result = handle(pool.clone(), reject).await;

        assert!(matches!(
            result,
            Err(DecideChangeRequestError::AlreadyDecided { .. })
        ));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_non_admin_reviewer_is_rejected(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .insert(&pool)
            .await?;

        let cmd = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Approve,
            comment: None,
            reviewer_id: Some(owner.id),
        };

        let result = handle(pool.clone(), cmd).await;
        assert!(matches!(
            result,
            Err(DecideChangeRequestError::ReviewerNotAdmin(_))
        ));

        let status =
            sqlx::query_scalar::<_, String>("SELECT status FROM change_requests WHERE id = $1")
                .bind(request.id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(status, "pending");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_inactive_admin_reviewer_is_rejected(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com")
            .with_active(false)
            .insert(&pool)
            .await?;
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .insert(&pool)
            .await?;

        let cmd = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Approve,
            comment: None,
            reviewer_id: Some(admin.id),
        };

        let result = handle(pool.clone(), cmd).await;
        assert!(matches!(
            result,
            Err(DecideChangeRequestError::ReviewerNotAdmin(_))
        ));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_unknown_request_not_found(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;

        let cmd = DecideChangeRequestCommand {
            request_id: Uuid::new_v4(),
            decision: Decision::Approve,
            comment: None,
            reviewer_id: Some(admin.id),
        };

        let result = handle(pool.clone(), cmd).await;
        assert!(matches!(result, Err(DecideChangeRequestError::NotFound(_))));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_approve_with_drifted_control_appends_nothing(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Daily bank reconciliation")
            .insert(&pool)
            .await?;
        // Proposes the name the control already has
        let request = TestChangeRequest::new(control.id, owner.id)
            .with_changes(json!({ "name": "Daily bank reconciliation" }))
            .insert(&pool)
            .await?;

        let cmd = DecideChangeRequestCommand {
            request_id: request.id,
            decision: Decision::Approve,
            comment: None,
            reviewer_id: Some(admin.id),
        };

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        assert_eq!(response.status, "approved");

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert!(history.is_empty());

        Ok(())
    }
}
