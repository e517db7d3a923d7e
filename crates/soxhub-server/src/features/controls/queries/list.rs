use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::pagination::{PaginationMetadata, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use soxhub_common::types::{ControlStatus, ControlType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListControlsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Filter by lifecycle status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Filter by control type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    /// Filter by owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    /// Case-insensitive search over code and name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

/// Slim control representation for list responses
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ControlListItem {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub frequency: String,
    pub control_type: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListControlsResponse {
    pub items: Vec<ControlListItem>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListControlsError {
    #[error("Page must be greater than 0")]
    InvalidPage,
    #[error("Per page must be between 1 and 100")]
    InvalidPerPage,
    #[error("Invalid status '{0}'")]
    InvalidStatus(String),
    #[error("Invalid control type '{0}'")]
    InvalidControlType(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListControlsResponse, ListControlsError>> for ListControlsQuery {}

impl crate::cqrs::middleware::Query for ListControlsQuery {}

impl ListControlsQuery {
    pub fn validate(&self) -> Result<(), ListControlsError> {
        if let Some(page) = self.page {
            if page < 1 {
                return Err(ListControlsError::InvalidPage);
            }
        }
        if let Some(per_page) = self.per_page {
            if per_page < 1 || per_page > MAX_PER_PAGE {
                return Err(ListControlsError::InvalidPerPage);
            }
        }
        if let Some(status) = &self.status {
            status
                .parse::<ControlStatus>()
                .map_err(|_| ListControlsError::InvalidStatus(status.clone()))?;
        }
        if let Some(control_type) = &self.control_type {
            control_type
                .parse::<ControlType>()
                .map_err(|_| ListControlsError::InvalidControlType(control_type.clone()))?;
        }
        Ok(())
    }

    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListControlsQuery,
) -> Result<ListControlsResponse, ListControlsError> {
    query.validate()?;

    let page = query.page();
    let per_page = query.per_page();
    let offset = (page - 1) * per_page;

    let search_pattern = query.q.as_ref().map(|q| format!("%{}%", q.to_lowercase()));

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM controls
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR control_type = $2)
          AND ($3::UUID IS NULL OR owner_id = $3)
          AND ($4::TEXT IS NULL OR LOWER(code) LIKE $4 OR LOWER(name) LIKE $4)
        "#,
    )
    .bind(query.status.as_deref())
    .bind(query.control_type.as_deref())
    .bind(query.owner_id)
    .bind(search_pattern.as_deref())
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, ControlListItem>(
        r#"
        SELECT id, code, name, owner_id, frequency, control_type, status, updated_at
        FROM controls
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR control_type = $2)
          AND ($3::UUID IS NULL OR owner_id = $3)
          AND ($4::TEXT IS NULL OR LOWER(code) LIKE $4 OR LOWER(name) LIKE $4)
        ORDER BY code ASC
        LIMIT $5
        OFFSET $6
        "#,
    )
    .bind(query.status.as_deref())
    .bind(query.control_type.as_deref())
    .bind(query.owner_id)
    .bind(search_pattern.as_deref())
    .bind(per_page)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(ListControlsResponse {
        items,
        pagination: PaginationMetadata::new(page, per_page, total),
    })
}
