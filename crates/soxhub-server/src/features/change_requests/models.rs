//! Row and response types for the change request feature

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A change request row as stored in the `change_requests` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChangeRequestRecord {
    pub id: Uuid,
    pub control_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
    pub proposed_changes: JsonValue,
    pub status: String,
    pub reviewer_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub request_comment: Option<String>,
    pub review_comment: Option<String>,
}

/// API representation of a change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestResponse {
    pub id: Uuid,
    pub control_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
    pub proposed_changes: JsonValue,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
}

impl From<ChangeRequestRecord> for ChangeRequestResponse {
    fn from(record: ChangeRequestRecord) -> Self {
        ChangeRequestResponse {
            id: record.id,
            control_id: record.control_id,
            requester_id: record.requester_id,
            requested_at: record.requested_at,
            proposed_changes: record.proposed_changes,
            status: record.status,
            reviewer_id: record.reviewer_id,
            reviewed_at: record.reviewed_at,
            request_comment: record.request_comment,
            review_comment: record.review_comment,
        }
    }
}

/// Columns selected whenever a full change request row is loaded
pub(crate) const CHANGE_REQUEST_COLUMNS: &str = "id, control_id, requester_id, requested_at, \
     proposed_changes, status, reviewer_id, reviewed_at, request_comment, review_comment";

/// Fetch one change request row by id
pub(crate) async fn fetch_request<'e, E>(
    executor: E,
    id: Uuid,
) -> Result<Option<ChangeRequestRecord>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM change_requests WHERE id = $1",
        CHANGE_REQUEST_COLUMNS
    );

    sqlx::query_as::<_, ChangeRequestRecord>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Fetch one change request row by id, locking it for the rest of the
/// transaction so concurrent decisions serialize
pub(crate) async fn fetch_request_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<ChangeRequestRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM change_requests WHERE id = $1 FOR UPDATE",
        CHANGE_REQUEST_COLUMNS
    );

    sqlx::query_as::<_, ChangeRequestRecord>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}
