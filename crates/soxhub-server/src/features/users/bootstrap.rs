//! Bootstrap admin seeding
//!
//! Runs once at startup. When the users table holds no active admin, the
//! configured default admin is inserted, so the last-admin rule holds from
//! the first request onward.

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::BootstrapConfig;
use soxhub_common::types::Role;

/// Ensure at least one active admin exists
///
/// Returns `true` when a bootstrap admin was seeded. If a user with the
/// configured email already exists, that account is promoted and
/// reactivated instead of inserting a second row.
pub async fn ensure_bootstrap_admin(
    pool: &PgPool,
    config: &BootstrapConfig,
) -> Result<bool, sqlx::Error> {
    let active_admins = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE $1 = ANY(roles) AND active",
    )
    .bind(Role::Admin.as_str())
    .fetch_one(pool)
    .await?;

    if active_admins > 0 {
        tracing::debug!(active_admins, "Active admin present, no bootstrap needed");
        return Ok(false);
    }

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (name, email, roles, active)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (email) DO UPDATE
        SET roles = EXCLUDED.roles, active = TRUE, updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(&config.admin_name)
    .bind(&config.admin_email)
    .bind(vec![Role::Admin.as_str().to_string()])
    .fetch_one(pool)
    .await?;

    tracing::warn!(
        user_id = %id,
        email = %config.admin_email,
        "No active admin found; bootstrap admin seeded"
    );

    Ok(true)
}
