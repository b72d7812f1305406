use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::types::{LogEntry, LogSearch, NewLogEntry};

pub const MAX_BULK_ENTRIES: usize = 100;
const DEFAULT_SEARCH_LIMIT: i64 = 100;

pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, entry: &NewLogEntry) -> Result<LogEntry, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        "INSERT INTO application_logs \
         (application_id, application_step, user_name, application_status, \
          application_decision, application_remarks, start_date, accomplished_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(entry.application_id)
    .bind(&entry.application_step)
    .bind(&entry.user_name)
    .bind(&entry.application_status)
    .bind(&entry.application_decision)
    .bind(&entry.application_remarks)
    .bind(entry.start_date)
    .bind(entry.accomplished_date)
    .fetch_one(executor)
    .await
}

/// Insert all entries in one transaction. Any failure rolls back the batch.
pub async fn insert_many(pool: &PgPool, entries: &[NewLogEntry]) -> Result<Vec<LogEntry>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(entries.len());
    for entry in entries {
        created.push(insert(&mut *tx, entry).await?);
    }
    tx.commit().await?;
    Ok(created)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<LogEntry>, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>("SELECT * FROM application_logs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Newest first.
pub async fn find_by_application(pool: &PgPool, application_id: i64) -> Result<Vec<LogEntry>, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        "SELECT * FROM application_logs WHERE application_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(application_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_application_and_step(
    pool: &PgPool,
    application_id: i64,
    step: &str,
) -> Result<Vec<LogEntry>, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        "SELECT * FROM application_logs \
         WHERE application_id = $1 AND LOWER(application_step) = LOWER($2) \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(application_id)
    .bind(step)
    .fetch_all(pool)
    .await
}

pub async fn search(pool: &PgPool, criteria: &LogSearch) -> Result<Vec<LogEntry>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM application_logs WHERE 1=1");
    if let Some(step) = &criteria.step {
        qb.push(" AND LOWER(application_step) = LOWER(").push_bind(step.clone()).push(")");
    }
    if let Some(user) = &criteria.user {
        qb.push(" AND user_name ILIKE ").push_bind(format!("%{user}%"));
    }
    if let Some(from) = criteria.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = criteria.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    let limit = criteria.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 1000);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(limit);
    qb.build_query_as::<LogEntry>().fetch_all(pool).await
}
