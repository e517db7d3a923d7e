use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::change_requests::models::{
    ChangeRequestRecord, ChangeRequestResponse, CHANGE_REQUEST_COLUMNS,
};
use crate::features::shared::pagination::{PaginationMetadata, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use soxhub_common::types::RequestStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChangeRequestsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Filter by review status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Filter by target control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChangeRequestsResponse {
    pub items: Vec<ChangeRequestResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListChangeRequestsError {
    #[error("Page must be greater than 0")]
    InvalidPage,
    #[error("Per page must be between 1 and 100")]
    InvalidPerPage,
    #[error("Invalid status '{0}'")]
    InvalidStatus(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListChangeRequestsResponse, ListChangeRequestsError>>
    for ListChangeRequestsQuery
{
}

impl crate::cqrs::middleware::Query for ListChangeRequestsQuery {}

impl ListChangeRequestsQuery {
    pub fn validate(&self) -> Result<(), ListChangeRequestsError> {
        if let Some(page) = self.page {
            if page < 1 {
                return Err(ListChangeRequestsError::InvalidPage);
            }
        }
        if let Some(per_page) = self.per_page {
            if per_page < 1 || per_page > MAX_PER_PAGE {
                return Err(ListChangeRequestsError::InvalidPerPage);
            }
        }
        if let Some(status) = &self.status {
            status
                .parse::<RequestStatus>()
                .map_err(|_| ListChangeRequestsError::InvalidStatus(status.clone()))?;
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
    query: ListChangeRequestsQuery,
) -> Result<ListChangeRequestsResponse, ListChangeRequestsError> {
    query.validate()?;

    let page = query.page();
    let per_page = query.per_page();
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM change_requests
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::UUID IS NULL OR control_id = $2)
        "#,
    )
    .bind(query.status.as_deref())
    .bind(query.control_id)
    .fetch_one(&pool)
    .await?;

    let sql = format!(
        r#"
        SELECT {}
        FROM change_requests
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::UUID IS NULL OR control_id = $2)
        ORDER BY requested_at DESC
        LIMIT $3
        OFFSET $4
        "#,
        CHANGE_REQUEST_COLUMNS
    );

    let records = sqlx::query_as::<_, ChangeRequestRecord>(&sql)
        .bind(query.status.as_deref())
        .bind(query.control_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    let items = records.into_iter().map(ChangeRequestResponse::from).collect();

    Ok(ListChangeRequestsResponse {
        items,
        pagination: PaginationMetadata::new(page, per_page, total),
    })
}
