use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{PaginationMetadata, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::features::users::models::{UserResponse, UserWithControls, USER_WITH_CONTROLS_SELECT};
use soxhub_common::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Filter by role membership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Filter by the active flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub items: Vec<UserResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListUsersError {
    #[error("Page must be greater than 0")]
    InvalidPage,
    #[error("Per page must be between 1 and 100")]
    InvalidPerPage,
    #[error("Unknown role '{0}'")]
    InvalidRole(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListUsersResponse, ListUsersError>> for ListUsersQuery {}

impl crate::cqrs::middleware::Query for ListUsersQuery {}

impl ListUsersQuery {
    pub fn validate(&self) -> Result<(), ListUsersError> {
        if let Some(page) = self.page {
            if page < 1 {
                return Err(ListUsersError::InvalidPage);
            }
        }
        if let Some(per_page) = self.per_page {
            if per_page < 1 || per_page > MAX_PER_PAGE {
                return Err(ListUsersError::InvalidPerPage);
            }
        }
        if let Some(role) = &self.role {
            role.parse::<Role>()
                .map_err(|_| ListUsersError::InvalidRole(role.clone()))?;
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
    query: ListUsersQuery,
) -> Result<ListUsersResponse, ListUsersError> {
    query.validate()?;

    let page = query.page();
    let per_page = query.per_page();
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE ($1::TEXT IS NULL OR $1 = ANY(roles))
          AND ($2::BOOLEAN IS NULL OR active = $2)
        "#,
    )
    .bind(query.role.as_deref())
    .bind(query.active)
    .fetch_one(&pool)
    .await?;

    let sql = format!(
        r#"
        {}
        WHERE ($1::TEXT IS NULL OR $1 = ANY(u.roles))
          AND ($2::BOOLEAN IS NULL OR u.active = $2)
        GROUP BY u.id
        ORDER BY u.name ASC, u.email ASC
        LIMIT $3
        OFFSET $4
        "#,
        USER_WITH_CONTROLS_SELECT
    );

    let rows = sqlx::query_as::<_, UserWithControls>(&sql)
        .bind(query.role.as_deref())
        .bind(query.active)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    Ok(ListUsersResponse {
        items: rows.into_iter().map(UserResponse::from).collect(),
        pagination: PaginationMetadata::new(page, per_page, total),
    })
}
