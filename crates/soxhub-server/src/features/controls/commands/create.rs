//! Create control command
//!
//! Inserts a new control and appends a creation entry to its version
//! history in the same transaction.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::controls::changes::snapshot;
use crate::features::controls::models::{ControlRecord, ControlResponse, CONTROL_COLUMNS};
use crate::features::shared::validation::{
    validate_code, validate_name, CodeValidationError, NameValidationError, CODE_MAX_LENGTH,
    NAME_MAX_LENGTH,
};
use crate::history::{append_entry, NewVersionEntry};
use soxhub_common::types::{ControlFrequency, ControlStatus, ControlType};

/// Command to create a new control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateControlCommand {
    /// Unique control code, e.g. "FIN-001"
    pub code: String,

    /// Display name of the control
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Optional owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,

    /// Execution frequency, e.g. "monthly"
    pub frequency: String,

    /// "preventive" or "detective"
    pub control_type: String,

    /// Initial lifecycle status; defaults to "draft"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default)]
    pub related_risks: Vec<String>,

    #[serde(default)]
    pub test_procedures: String,

    #[serde(default)]
    pub evidence_requirements: String,

    /// Acting user, taken from the request headers rather than the body
    #[serde(skip)]
    pub actor_id: Option<Uuid>,
}

/// Errors that can occur when creating a control
#[derive(Debug, thiserror::Error)]
pub enum CreateControlError {
    #[error("Code validation failed: {0}")]
    CodeValidation(#[from] CodeValidationError),

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Invalid frequency '{0}'")]
    InvalidFrequency(String),

    #[error("Invalid control type '{0}'")]
    InvalidControlType(String),

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Control with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("Owner '{0}' does not exist")]
    OwnerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ControlResponse, CreateControlError>> for CreateControlCommand {}

impl crate::cqrs::middleware::Command for CreateControlCommand {}

impl CreateControlCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - Code must be 1-32 characters of uppercase letters, digits and
    ///   hyphens, with no leading or trailing hyphen
    /// - Name must be 1-256 characters
    /// - Frequency, control type and status must be known values
    #[tracing::instrument(skip(self), fields(code = %self.code, name = %self.name))]
    pub fn validate(&self) -> Result<(), CreateControlError> {
        validate_code(&self.code, CODE_MAX_LENGTH)?;
        validate_name(&self.name, NAME_MAX_LENGTH)?;

        self.frequency
            .parse::<ControlFrequency>()
            .map_err(|_| CreateControlError::InvalidFrequency(self.frequency.clone()))?;
        self.control_type
            .parse::<ControlType>()
            .map_err(|_| CreateControlError::InvalidControlType(self.control_type.clone()))?;
        if let Some(status) = &self.status {
            status
                .parse::<ControlStatus>()
                .map_err(|_| CreateControlError::InvalidStatus(status.clone()))?;
        }

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

/// Handler function for creating controls
///
/// Inserts the control and its creation history entry in one transaction.
///
/// # Errors
///
/// - Validation errors if command parameters are invalid
/// - Duplicate error if a control with the same code exists
/// - Owner error if `owner_id` references no user
#[tracing::instrument(
    skip(pool, command),
    fields(code = %command.code, name = %command.name)
)]
pub async fn handle(
    pool: PgPool,
    command: CreateControlCommand,
) -> Result<ControlResponse, CreateControlError> {
    command.validate()?;

    tracing::info!("Creating control");

    let status = command.status.as_deref().unwrap_or("draft");

    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO controls (
            code, name, description, owner_id, frequency, control_type,
            status, related_risks, test_procedures, evidence_requirements
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        CONTROL_COLUMNS
    );

    let control = sqlx::query_as::<_, ControlRecord>(&sql)
        .bind(&command.code)
        .bind(&command.name)
        .bind(&command.description)
        .bind(command.owner_id)
        .bind(&command.frequency)
        .bind(&command.control_type)
        .bind(status)
        .bind(&command.related_risks)
        .bind(&command.test_procedures)
        .bind(&command.evidence_requirements)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return CreateControlError::DuplicateCode(command.code.clone());
                }
                if db_err.is_foreign_key_violation() {
                    if let Some(owner_id) = command.owner_id {
                        return CreateControlError::OwnerNotFound(owner_id);
                    }
                }
            }
            CreateControlError::Database(e)
        })?;

    let entry = NewVersionEntry::builder(control.id)
        .changed_by(command.actor_id)
        .summary("Created")
        .new_values(serde_json::Value::Object(snapshot(&control)))
        .build();
    append_entry(&mut *tx, entry).await?;

    tx.commit().await?;

    tracing::info!(
        control_id = %control.id,
        control_code = %control.code,
        "Control created successfully"
    );

    Ok(ControlResponse::from(control))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestUser;
    use crate::history::get_control_history;

    fn valid_command() -> CreateControlCommand {
        CreateControlCommand {
            code: "FIN-001".to_string(),
            name: "Bank reconciliation".to_string(),
            description: "Monthly reconciliation of bank accounts".to_string(),
            owner_id: None,
            frequency: "monthly".to_string(),
            control_type: "preventive".to_string(),
            status: Some("active".to_string()),
            related_risks: vec!["R-01".to_string()],
            test_procedures: String::new(),
            evidence_requirements: String::new(),
            actor_id: None,
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(valid_command().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_lowercase_code() {
        let mut cmd = valid_command();
        cmd.code = "fin-001".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(CreateControlError::CodeValidation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_empty_name() {
        let mut cmd = valid_command();
        cmd.name = "   ".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(CreateControlError::NameValidation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_frequency() {
        let mut cmd = valid_command();
        cmd.frequency = "hourly".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(CreateControlError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_control_type() {
        let mut cmd = valid_command();
        cmd.control_type = "corrective".to_string();
        assert!(matches!(
            cmd.validate(),
            Err(CreateControlError::InvalidControlType(_))
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_status() {
        let mut cmd = valid_command();
        cmd.status = Some("archived".to_string());
        assert!(matches!(
            cmd.validate(),
            Err(CreateControlError::InvalidStatus(_))
        ));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_creates_control_with_history(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;

        let mut cmd = valid_command();
        cmd.actor_id = Some(admin.id);

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.code, "FIN-001");
        assert_eq!(response.status, "active");

        let history = get_control_history(&pool, response.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary, "Created");
        assert_eq!(history[0].changed_by, Some(admin.id));
        assert_eq!(history[0].previous_values, serde_json::json!({}));
        assert_eq!(history[0].new_values["code"], "FIN-001");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_defaults_status_to_draft(pool: PgPool) -> sqlx::Result<()> {
        let mut cmd = valid_command();
        cmd.status = None;

        let response = handle(pool.clone(), cmd)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.status, "draft");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_duplicate_code(pool: PgPool) -> sqlx::Result<()> {
        handle(pool.clone(), valid_command())
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let mut second = valid_command();
        second.name = "Another control".to_string();
        let result = handle(pool.clone(), second).await;

        assert!(matches!(result, Err(CreateControlError::DuplicateCode(_))));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_unknown_owner(pool: PgPool) -> sqlx::Result<()> {
        let mut cmd = valid_command();
        cmd.owner_id = Some(Uuid::new_v4());

        let result = handle(pool.clone(), cmd).await;

        assert!(matches!(result, Err(CreateControlError::OwnerNotFound(_))));

        Ok(())
    }
}
