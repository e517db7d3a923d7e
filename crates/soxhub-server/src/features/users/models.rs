//! Row and response types for the user administration feature
//!
//! User rows carry their role set as a text array; the `admin` and
//! `control-owner` values are enforced at the command boundary. API
//! responses attach the derived list of owned control ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use soxhub_common::types::Role;

/// A user row as stored in the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// True when this user is active and holds the admin role
    pub fn is_active_admin(&self) -> bool {
        self.active && self.roles.iter().any(|r| r == Role::Admin.as_str())
    }
}

/// A user row joined with the ids of the controls it owns
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithControls {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub active: bool,
    pub owned_controls: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API representation of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub active: bool,
    /// Ids of the controls this user owns
    pub owned_controls: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserWithControls> for UserResponse {
    fn from(record: UserWithControls) -> Self {
        UserResponse {
            id: record.id,
            name: record.name,
            email: record.email,
            roles: record.roles,
            active: record.active,
            owned_controls: record.owned_controls,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Columns selected whenever a plain user row is loaded
pub(crate) const USER_COLUMNS: &str = "id, name, email, roles, active, created_at, updated_at";

/// Select list joining each user with its owned control ids
pub(crate) const USER_WITH_CONTROLS_SELECT: &str = r#"
    SELECT u.id, u.name, u.email, u.roles, u.active,
           COALESCE(array_agg(c.id ORDER BY c.code) FILTER (WHERE c.id IS NOT NULL),
                    ARRAY[]::uuid[]) AS owned_controls,
           u.created_at, u.updated_at
    FROM users u
    LEFT JOIN controls c ON c.owner_id = u.id
"#;

/// Fetch one user with owned control ids
pub(crate) async fn fetch_user_with_controls<'e, E>(
    executor: E,
    id: Uuid,
) -> Result<Option<UserWithControls>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("{} WHERE u.id = $1 GROUP BY u.id", USER_WITH_CONTROLS_SELECT);

    sqlx::query_as::<_, UserWithControls>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Fetch one user row by id, locking it for the rest of the transaction
pub(crate) async fn fetch_user_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);

    sqlx::query_as::<_, UserRecord>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

/// Ids of the controls owned by a user, ordered by control code
pub(crate) async fn owned_control_ids<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM controls WHERE owner_id = $1 ORDER BY code")
        .bind(user_id)
        .fetch_all(executor)
        .await
}

/// Parse raw role strings into typed roles
///
/// Returns the first unrecognized value on failure so callers can name
/// it in their own error type.
pub(crate) fn parse_roles(raw: &[String]) -> Result<Vec<Role>, String> {
    let mut roles = Vec::with_capacity(raw.len());
    for value in raw {
        let role = value.parse::<Role>().map_err(|_| value.clone())?;
        roles.push(role);
    }
    Ok(roles)
}

/// Count active admins other than the given user
///
/// The last-admin rule: an operation that would remove the admin role
/// from, deactivate, or delete a user must fail when this count is zero
/// and the user is currently an active admin.
pub(crate) async fn count_other_active_admins(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE $1 = ANY(roles) AND active AND id != $2
        "#,
    )
    .bind(Role::Admin.as_str())
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
}
