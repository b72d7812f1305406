use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};

use super::types::{Delegation, Stage, StageState};

const SELECT_DELEGATION: &str = "\
    SELECT d.*, a.dtn \
    FROM application_delegation d \
    JOIN applications a ON a.id = d.application_id";

/// SQL predicate: the evaluator column holds a meaningful actor.
pub const DECKED_SQL: &str = "COALESCE(NULLIF(BTRIM(d.evaluator), ''), 'N/A') <> 'N/A'";
/// Complement of [`DECKED_SQL`]; also true when the delegation row is missing.
pub const NOT_DECKED_SQL: &str = "COALESCE(NULLIF(BTRIM(d.evaluator), ''), 'N/A') = 'N/A'";

pub async fn find_by_application<'e, E: PgExecutor<'e>>(
    executor: E,
    application_id: i64,
) -> Result<Option<Delegation>, sqlx::Error> {
    sqlx::query_as::<_, Delegation>(&format!("{SELECT_DELEGATION} WHERE d.application_id = $1"))
        .bind(application_id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_applications<'e, E: PgExecutor<'e>>(
    executor: E,
    application_ids: &[i64],
) -> Result<Vec<Delegation>, sqlx::Error> {
    sqlx::query_as::<_, Delegation>(&format!(
        "{SELECT_DELEGATION} WHERE d.application_id = ANY($1)"
    ))
    .bind(application_ids)
    .fetch_all(executor)
    .await
}

/// Create an empty delegation row for the application if none exists.
pub async fn ensure_for_application(conn: &mut PgConnection, application_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO application_delegation (application_id) VALUES ($1) \
         ON CONFLICT (application_id) DO NOTHING",
    )
    .bind(application_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert a fully populated delegation row (used by imports).
pub async fn insert(conn: &mut PgConnection, record: &Delegation) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO application_delegation (application_id, date_decked");
    for stage in Stage::ALL {
        let p = stage.column();
        qb.push(format!(", {p}, {p}_decision, {p}_remarks, {p}_state, {p}_end"));
    }
    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        values.push_bind(record.application_id);
        values.push_bind(record.date_decked);
        for slot in &record.stages {
            values.push_bind(slot.actor.clone());
            values.push_bind(slot.decision.clone());
            values.push_bind(slot.remarks.clone());
            values.push_bind(slot.state.as_str());
            values.push_bind(slot.completed_at);
        }
    }
    qb.push(") RETURNING id");
    let row: (i64,) = qb.build_query_as().fetch_one(conn).await?;
    Ok(row.0)
}

/// Write every workflow column of the record back to its row.
pub async fn save(conn: &mut PgConnection, record: &Delegation) -> Result<(), sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE application_delegation SET date_decked = ");
    qb.push_bind(record.date_decked);
    for stage in Stage::ALL {
        let p = stage.column();
        let slot = record.stage(stage);
        qb.push(format!(", {p} = ")).push_bind(slot.actor.clone());
        qb.push(format!(", {p}_decision = ")).push_bind(slot.decision.clone());
        qb.push(format!(", {p}_remarks = ")).push_bind(slot.remarks.clone());
        qb.push(format!(", {p}_state = ")).push_bind(slot.state.as_str());
        qb.push(format!(", {p}_end = ")).push_bind(slot.completed_at);
    }
    qb.push(" WHERE application_id = ").push_bind(record.application_id);
    qb.build().execute(conn).await?;
    Ok(())
}

/// Decked applications, optionally narrowed to an evaluator and/or decker.
pub async fn find_decked(
    pool: &PgPool,
    evaluator: Option<&str>,
    decker: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Delegation>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT_DELEGATION);
    qb.push(" WHERE a.trash IS NULL AND ").push(DECKED_SQL);
    if let Some(evaluator) = evaluator {
        qb.push(" AND d.evaluator = ").push_bind(evaluator.to_string());
    }
    if let Some(decker) = decker {
        qb.push(" AND d.decker = ").push_bind(decker.to_string());
    }
    qb.push(" ORDER BY d.date_decked DESC NULLS LAST, d.application_id");
    qb.push(" OFFSET ").push_bind(skip).push(" LIMIT ").push_bind(limit);
    qb.build_query_as::<Delegation>().fetch_all(pool).await
}

pub async fn find_not_decked(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Delegation>, sqlx::Error> {
    sqlx::query_as::<_, Delegation>(&format!(
        "{SELECT_DELEGATION} WHERE a.trash IS NULL AND {NOT_DECKED_SQL} \
         ORDER BY d.application_id OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Count of stage rows in the given state. Used by the summary endpoint.
pub async fn count_in_state(pool: &PgPool, stage: Stage, state: StageState) -> Result<i64, sqlx::Error> {
    let p = stage.column();
    let row: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM application_delegation d \
         JOIN applications a ON a.id = d.application_id \
         WHERE a.trash IS NULL AND d.{p}_state = $1"
    ))
    .bind(state.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
