//! Version history data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// History Query Constants
// ============================================================================

/// Default number of history entries returned per query
pub const DEFAULT_HISTORY_QUERY_LIMIT: i64 = 100;

/// Maximum number of history entries that can be returned in a single query.
/// This prevents excessive memory usage and query timeouts.
pub const MAX_HISTORY_QUERY_LIMIT: i64 = 1000;

/// Version history entry from the database
///
/// One row per control mutation: creation, direct edit, status change, or
/// approved change request. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VersionEntry {
    /// Unique identifier for the history entry
    pub id: Uuid,
    /// Control this entry belongs to
    pub control_id: Uuid,
    /// When the change happened
    pub changed_at: DateTime<Utc>,
    /// User who made the change (nullable when the actor is unknown)
    pub changed_by: Option<Uuid>,
    /// Human-readable change summary, e.g. "Updated frequency, name"
    pub summary: String,
    /// Field values before the change, keyed by field name
    pub previous_values: JsonValue,
    /// Field values after the change, keyed by field name
    pub new_values: JsonValue,
}

/// A history entry waiting to be written
#[derive(Debug, Clone)]
pub struct NewVersionEntry {
    pub control_id: Uuid,
    pub changed_by: Option<Uuid>,
    pub summary: String,
    pub previous_values: JsonValue,
    pub new_values: JsonValue,
}

impl NewVersionEntry {
    /// Start building an entry for a control
    pub fn builder(control_id: Uuid) -> VersionEntryBuilder {
        VersionEntryBuilder::new(control_id)
    }
}

/// Builder for [`NewVersionEntry`]
#[derive(Debug, Clone)]
pub struct VersionEntryBuilder {
    control_id: Uuid,
    changed_by: Option<Uuid>,
    summary: String,
    previous_values: JsonValue,
    new_values: JsonValue,
}

impl VersionEntryBuilder {
    pub fn new(control_id: Uuid) -> Self {
        Self {
            control_id,
            changed_by: None,
            summary: String::new(),
            previous_values: JsonValue::Object(serde_json::Map::new()),
            new_values: JsonValue::Object(serde_json::Map::new()),
        }
    }

    pub fn changed_by(mut self, user_id: Option<Uuid>) -> Self {
        self.changed_by = user_id;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn previous_values(mut self, values: JsonValue) -> Self {
        self.previous_values = values;
        self
    }

    pub fn new_values(mut self, values: JsonValue) -> Self {
        self.new_values = values;
        self
    }

    pub fn build(self) -> NewVersionEntry {
        NewVersionEntry {
            control_id: self.control_id,
            changed_by: self.changed_by,
            summary: self.summary,
            previous_values: self.previous_values,
            new_values: self.new_values,
        }
    }
}

/// Filters for querying the history log
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one control
    pub control_id: Option<Uuid>,
    /// Restrict to changes made by one user
    pub changed_by: Option<Uuid>,
    /// Entries at or after this time
    pub start_time: Option<DateTime<Utc>>,
    /// Entries at or before this time
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum entries to return
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Entries to skip
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_HISTORY_QUERY_LIMIT
}

impl mediator::Request<crate::error::AppResult<Vec<VersionEntry>>> for HistoryQuery {}

impl crate::cqrs::middleware::Query for HistoryQuery {}

impl Default for HistoryQuery {
    fn default() -> Self {
        HistoryQuery {
            control_id: None,
            changed_by: None,
            start_time: None,
            end_time: None,
            limit: DEFAULT_HISTORY_QUERY_LIMIT,
            offset: 0,
        }
    }
}
