use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::users::models::{fetch_user_with_controls, UserResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetUserError {
    #[error("User '{0}' not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UserResponse, GetUserError>> for GetUserQuery {}

impl crate::cqrs::middleware::Query for GetUserQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetUserQuery) -> Result<UserResponse, GetUserError> {
    let user = fetch_user_with_controls(&pool, query.id)
        .await?
        .ok_or(GetUserError::NotFound(query.id))?;

    Ok(UserResponse::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestControl, TestUser};

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_returns_user_with_owned_controls(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestUser::owner("omar@example.com").insert(&pool).await?;
        let second = TestControl::new("ITGC-002", "Access review")
            .with_owner(owner.id)
            .insert(&pool)
            .await?;
        let first = TestControl::new("FIN-001", "Bank reconciliation")
            .with_owner(owner.id)
            .insert(&pool)
            .await?;
        TestControl::new("REV-003", "Revenue cutoff").insert(&pool).await?;

        let response = handle(pool.clone(), GetUserQuery { id: owner.id })
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.email, "omar@example.com");
        // Owned controls come back ordered by control code
        assert_eq!(response.owned_controls, vec![first.id, second.id]);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_user_without_controls(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("dana@example.com").insert(&pool).await?;

        let response = handle(pool.clone(), GetUserQuery { id: admin.id })
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert!(response.owned_controls.is_empty());

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_not_found(pool: PgPool) -> sqlx::Result<()> {
        let result = handle(pool.clone(), GetUserQuery { id: Uuid::new_v4() }).await;

        assert!(matches!(result, Err(GetUserError::NotFound(_))));

        Ok(())
    }
}
