use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::change_requests::models::{fetch_request, ChangeRequestResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetChangeRequestQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetChangeRequestError {
    #[error("Change request '{0}' not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ChangeRequestResponse, GetChangeRequestError>> for GetChangeRequestQuery {}

impl crate::cqrs::middleware::Query for GetChangeRequestQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: GetChangeRequestQuery,
) -> Result<ChangeRequestResponse, GetChangeRequestError> {
    let request = fetch_request(&pool, query.id)
        .await?
        .ok_or(GetChangeRequestError::NotFound(query.id))?;

    Ok(ChangeRequestResponse::from(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestChangeRequest, TestControl, TestUser};

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_returns_request(pool: PgPool) -> sqlx::Result<()> {
        let owner = TestUser::owner("owner@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;
        let request = TestChangeRequest::new(control.id, owner.id)
            .insert(&pool)
            .await?;

        let query = GetChangeRequestQuery { id: request.id };
        let response = handle(pool.clone(), query)
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        assert_eq!(response.id, request.id);
        assert_eq!(response.control_id, control.id);
        assert_eq!(response.status, "pending");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_handle_not_found(pool: PgPool) -> sqlx::Result<()> {
        let query = GetChangeRequestQuery { id: Uuid::new_v4() };
        let result = handle(pool.clone(), query).await;

        assert!(matches!(result, Err(GetChangeRequestError::NotFound(_))));

        Ok(())
    }
}
