use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::controls::models::{fetch_control, ControlResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetControlQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetControlError {
    #[error("Control '{0}' not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ControlResponse, GetControlError>> for GetControlQuery {}

impl crate::cqrs::middleware::Query for GetControlQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetControlQuery) -> Result<ControlResponse, GetControlError> {
    let control = fetch_control(&pool, query.id)
        .await?
        .ok_or(GetControlError::NotFound(query.id))?;

    Ok(ControlResponse::from(control))
}
