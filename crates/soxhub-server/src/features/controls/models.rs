//! Shared row and response types for the controls feature
//!
//! Control rows store frequency, type and status as text; the typed enums in
//! `soxhub_common::types` are enforced at the command boundary and by the
//! table's check constraints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A control row as stored in the `controls` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ControlRecord {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub owner_id: Option<Uuid>,
    pub frequency: String,
    pub control_type: String,
    pub status: String,
    pub related_risks: Vec<String>,
    pub test_procedures: String,
    pub evidence_requirements: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API representation of a control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub frequency: String,
    pub control_type: String,
    pub status: String,
    pub related_risks: Vec<String>,
    pub test_procedures: String,
    pub evidence_requirements: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ControlRecord> for ControlResponse {
    fn from(record: ControlRecord) -> Self {
        ControlResponse {
            id: record.id,
            code: record.code,
            name: record.name,
            description: record.description,
            owner_id: record.owner_id,
            frequency: record.frequency,
            control_type: record.control_type,
            status: record.status,
            related_risks: record.related_risks,
            test_procedures: record.test_procedures,
            evidence_requirements: record.evidence_requirements,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Columns selected whenever a full control row is loaded
pub(crate) const CONTROL_COLUMNS: &str = "id, code, name, description, owner_id, frequency, \
     control_type, status, related_risks, test_procedures, evidence_requirements, \
     created_at, updated_at";

/// Fetch one control row by id
pub(crate) async fn fetch_control<'e, E>(
    executor: E,
    id: Uuid,
) -> Result<Option<ControlRecord>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("SELECT {} FROM controls WHERE id = $1", CONTROL_COLUMNS);

    sqlx::query_as::<_, ControlRecord>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Fetch one control row by id, locking it for the rest of the transaction
pub(crate) async fn fetch_control_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<ControlRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM controls WHERE id = $1 FOR UPDATE",
        CONTROL_COLUMNS
    );

    sqlx::query_as::<_, ControlRecord>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}
