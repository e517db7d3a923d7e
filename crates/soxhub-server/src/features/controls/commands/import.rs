//! Bulk import command
//!
//! Imports an array of control records in one transaction. Every row is
//! validated before anything is inserted; one bad row rejects the whole
//! batch. Each imported control gets a creation history entry, the same
//! as one created through the single-control path.

use std::collections::HashSet;

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::create::{CreateControlCommand, CreateControlError};
use crate::features::controls::changes::snapshot;
use crate::features::controls::models::{ControlRecord, ControlResponse, CONTROL_COLUMNS};
use crate::history::{append_entry, NewVersionEntry};

/// Command to import a batch of controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportControlsCommand {
    /// Control records to import; each row has the create-control shape
    pub controls: Vec<CreateControlCommand>,

    /// Acting user, taken from the request headers
    #[serde(skip)]
    pub actor_id: Option<Uuid>,
}

/// Response from a bulk import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportControlsResponse {
    pub imported: usize,
    pub controls: Vec<ControlResponse>,
}

/// Errors that can occur during bulk import
#[derive(Debug, thiserror::Error)]
pub enum ImportControlsError {
    #[error("Import batch is empty")]
    EmptyBatch,

    #[error("Row {index}: {source}")]
    InvalidRow {
        index: usize,
        #[source]
        source: CreateControlError,
    },

    #[error("Row {index}: code '{code}' appears more than once in the batch")]
    DuplicateCodeInBatch { index: usize, code: String },

    #[error("Control with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("Owner '{0}' does not exist")]
    OwnerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ImportControlsResponse, ImportControlsError>> for ImportControlsCommand {}

impl crate::cqrs::middleware::Command for ImportControlsCommand {}

impl ImportControlsCommand {
    /// Validates every row before any insert
    ///
    /// # Errors
    ///
    /// - Empty batch
    /// - Any row failing single-control validation, reported with its index
    /// - A code appearing more than once within the batch
    #[tracing::instrument(skip(self), fields(rows = self.controls.len()))]
    pub fn validate(&self) -> Result<(), ImportControlsError> {
        if self.controls.is_empty() {
            return Err(ImportControlsError::EmptyBatch);
        }

        let mut seen_codes = HashSet::new();
        for (index, row) in self.controls.iter().enumerate() {
            row.validate()
                .map_err(|source| ImportControlsError::InvalidRow { index, source })?;
            if !seen_codes.insert(row.code.clone()) {
                return Err(ImportControlsError::DuplicateCodeInBatch {
                    index,
                    code: row.code.clone(),
                });
            }
        }

        tracing::debug!("Import batch validation passed");
        Ok(())
    }
}

/// Handler function for bulk imports
///
/// Inserts all rows and their history entries in one transaction; any
/// failure rolls the whole batch back.
#[tracing::instrument(skip(pool, command), fields(rows = command.controls.len()))]
pub async fn handle(
    pool: PgPool,
    command: ImportControlsCommand,
) -> Result<ImportControlsResponse, ImportControlsError> {
    command.validate()?;

    tracing::info!(rows = command.controls.len(), "Importing controls");

    let mut tx = pool.begin().await?;
    let mut imported = Vec::with_capacity(command.controls.len());

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

    for row in &command.controls {
        let status = row.status.as_deref().unwrap_or("draft");

        let control = sqlx::query_as::<_, ControlRecord>(&sql)
            .bind(&row.code)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.owner_id)
            .bind(&row.frequency)
            .bind(&row.control_type)
            .bind(status)
            .bind(&row.related_risks)
            .bind(&row.test_procedures)
            .bind(&row.evidence_requirements)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.is_unique_violation() {
                        return ImportControlsError::DuplicateCode(row.code.clone());
                    }
                    if db_err.is_foreign_key_violation() {
                        if let Some(owner_id) = row.owner_id {
                            return ImportControlsError::OwnerNotFound(owner_id);
                        }
                    }
                }
                ImportControlsError::Database(e)
            })?;

        let entry = NewVersionEntry::builder(control.id)
            .changed_by(command.actor_id)
            .summary("Created")
            .new_values(serde_json::Value::Object(snapshot(&control)))
            .build();
        append_entry(&mut *tx, entry).await?;

        imported.push(ControlResponse::from(control));
    }

    tx.commit().await?;

    tracing::info!(imported = imported.len(), "Controls imported successfully");

    Ok(ImportControlsResponse {
        imported: imported.len(),
        controls: imported,
    })
}
