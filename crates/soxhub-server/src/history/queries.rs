//! Database queries for the version history log

use sqlx::PgPool;
use tracing::debug;

use super::models::{
    HistoryQuery, NewVersionEntry, VersionEntry, DEFAULT_HISTORY_QUERY_LIMIT,
    MAX_HISTORY_QUERY_LIMIT,
};
use crate::error::AppResult;

/// Append a version history entry.
///
/// Takes any Postgres executor so mutating commands can append inside their
/// own transaction; the entry must commit or roll back together with the
/// control change it records.
pub async fn append_entry<'e, E>(
    executor: E,
    entry: NewVersionEntry,
) -> Result<VersionEntry, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let record = sqlx::query_as::<_, VersionEntry>(
        r#"
        INSERT INTO control_versions (
            control_id, changed_by, summary, previous_values, new_values
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, control_id, changed_at, changed_by, summary,
                  previous_values, new_values
        "#,
    )
    .bind(entry.control_id)
    .bind(entry.changed_by)
    .bind(&entry.summary)
    .bind(&entry.previous_values)
    .bind(&entry.new_values)
    .fetch_one(executor)
    .await?;

    debug!(
        entry_id = %record.id,
        control_id = %record.control_id,
        summary = %record.summary,
        "Appended version history entry"
    );

    Ok(record)
}

/// Query the global history feed with filters
///
/// Builds a dynamic query based on the provided filters and returns
/// matching entries, newest first.
pub async fn query_history(pool: &PgPool, query: HistoryQuery) -> AppResult<Vec<VersionEntry>> {
    let limit = query.limit.min(MAX_HISTORY_QUERY_LIMIT).max(1);
    let offset = query.offset.max(0);

    let mut sql = String::from(
        r#"
        SELECT id, control_id, changed_at, changed_by, summary,
               previous_values, new_values
        FROM control_versions
        WHERE 1=1
        "#,
    );

    let mut bind_count = 1;
    let mut conditions = Vec::new();

    // Build dynamic query based on filters
    if query.control_id.is_some() {
        conditions.push(format!("control_id = ${}", bind_count));
        bind_count += 1;
    }
    if query.changed_by.is_some() {
        conditions.push(format!("changed_by = ${}", bind_count));
        bind_count += 1;
    }
    if query.start_time.is_some() {
        conditions.push(format!("changed_at >= ${}", bind_count));
        bind_count += 1;
    }
    if query.end_time.is_some() {
        conditions.push(format!("changed_at <= ${}", bind_count));
        bind_count += 1;
    }

    for condition in conditions {
        sql.push_str(" AND ");
        sql.push_str(&condition);
    }

    sql.push_str(" ORDER BY changed_at DESC");
    sql.push_str(&format!(" LIMIT ${}", bind_count));
    bind_count += 1;
    sql.push_str(&format!(" OFFSET ${}", bind_count));

    let mut query_builder = sqlx::query_as::<_, VersionEntry>(&sql);

    // Bind parameters in order
    if let Some(control_id) = query.control_id {
        query_builder = query_builder.bind(control_id);
    }
    if let Some(changed_by) = query.changed_by {
        query_builder = query_builder.bind(changed_by);
    }
    if let Some(start_time) = query.start_time {
        query_builder = query_builder.bind(start_time);
    }
    if let Some(end_time) = query.end_time {
        query_builder = query_builder.bind(end_time);
    }

    let records = query_builder
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = records.len(), "Queried version history");

    Ok(records)
}

/// Get the history of one control, newest first
pub async fn get_control_history(
    pool: &PgPool,
    control_id: uuid::Uuid,
    limit: Option<i64>,
) -> AppResult<Vec<VersionEntry>> {
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_QUERY_LIMIT)
        .min(MAX_HISTORY_QUERY_LIMIT);

    let records = sqlx::query_as::<_, VersionEntry>(
        r#"
        SELECT id, control_id, changed_at, changed_by, summary,
               previous_values, new_values
        FROM control_versions
        WHERE control_id = $1
        ORDER BY changed_at DESC
        LIMIT $2
        "#,
    )
    .bind(control_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    debug!(
        control_id = %control_id,
        count = records.len(),
        "Retrieved control history"
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestControl, TestUser};
    use serde_json::json;
    use uuid::Uuid;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_append_entry(pool: PgPool) -> sqlx::Result<()> {
        let admin = TestUser::admin("admin@example.com").insert(&pool).await?;
        let control = TestControl::new("FIN-001", "Bank reconciliation")
            .insert(&pool)
            .await?;

        let entry = NewVersionEntry::builder(control.id)
            .changed_by(Some(admin.id))
            .summary("Updated name")
            .previous_values(json!({ "name": "Bank reconciliation" }))
            .new_values(json!({ "name": "Daily bank reconciliation" }))
            .build();

        let record = append_entry(&pool, entry).await?;

        assert_eq!(record.control_id, control.id);
        assert_eq!(record.changed_by, Some(admin.id));
        assert_eq!(record.summary, "Updated name");
        assert_eq!(record.new_values["name"], "Daily bank reconciliation");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_get_control_history_newest_first(pool: PgPool) -> sqlx::Result<()> {
        let control = TestControl::new("FIN-002", "Journal entry review")
            .insert(&pool)
            .await?;

        for i in 0..3 {
            let entry = NewVersionEntry::builder(control.id)
                .summary(format!("Change {}", i))
                .new_values(json!({ "index": i }))
                .build();
            append_entry(&pool, entry).await?;
        }

        let history = get_control_history(&pool, control.id, None)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;

        assert_eq!(history.len(), 3);
        for pair in history.windows(2) {
            assert!(pair[0].changed_at >= pair[1].changed_at);
        }

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_query_history_filters_by_control(pool: PgPool) -> sqlx::Result<()> {
        let first = TestControl::new("FIN-003", "Access review")
            .insert(&pool)
            .await?;
        let second = TestControl::new("FIN-004", "Vendor onboarding")
            .insert(&pool)
            .await?;

        for control_id in [first.id, second.id, second.id] {
            let entry = NewVersionEntry::builder(control_id)
                .summary("Created")
                .build();
            append_entry(&pool, entry).await?;
        }

        let query = HistoryQuery {
            control_id: Some(second.id),
            ..Default::default()
        };
        let results = query_history(&pool, query)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|entry| entry.control_id == second.id));

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_query_history_unknown_actor_is_empty(pool: PgPool) -> sqlx::Result<()> {
        let control = TestControl::new("FIN-005", "Payroll approval")
            .insert(&pool)
            .await?;
        append_entry(&pool, NewVersionEntry::builder(control.id).summary("Created").build())
            .await?;

        let query = HistoryQuery {
            changed_by: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let results = query_history(&pool, query)
            .await
            .map_err(|_| sqlx::Error::RowNotFound)?;

        assert!(results.is_empty());

        Ok(())
    }
}
