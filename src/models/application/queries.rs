use std::collections::HashMap;

use chrono::Local;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use super::filter::{self, ListCriteria};
use super::types::{
    Application, ApplicationDetails, ApplicationInput, ApplicationListItem, ApplicationSummary,
    LabelCount, ReceivedAt, ReceivedCounts, StageCount,
};
use crate::errors::AppError;
use crate::models::delegation::{self, Stage, StageState};

const FROM_LISTING: &str = "\
    FROM applications a \
    LEFT JOIN application_delegation d ON d.application_id = a.id";

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Application>, sqlx::Error> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert the application row only. Callers create the delegation row.
pub async fn insert(
    conn: &mut PgConnection,
    input: &ApplicationInput,
    uploader: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let provided = input.details.provided();
    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO applications (dtn, is_in_pm, user_uploader, date_excel_upload",
    );
    for (col, _) in &provided {
        qb.push(", ").push(*col);
    }
    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        values.push_bind(input.dtn);
        values.push_bind(input.is_in_pm.unwrap_or(0));
        values.push_bind(uploader.map(str::to_string));
        values.push_bind(Local::now().naive_local());
        for (_, value) in &provided {
            values.push_bind(value.to_string());
        }
    }
    qb.push(") RETURNING id");
    let row: (i64,) = qb.build_query_as().fetch_one(conn).await?;
    Ok(row.0)
}

/// Create an application together with its empty delegation row.
pub async fn create(pool: &PgPool, input: &ApplicationInput, uploader: Option<&str>) -> Result<Application, AppError> {
    let mut created = create_many(pool, std::slice::from_ref(input), uploader).await?;
    created
        .pop()
        .ok_or_else(|| AppError::NotFound("Created application could not be read back".to_string()))
}

/// Create all applications in one transaction.
pub async fn create_many(
    pool: &PgPool,
    inputs: &[ApplicationInput],
    uploader: Option<&str>,
) -> Result<Vec<Application>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(inputs.len());
    for input in inputs {
        let id = insert(&mut *tx, input, uploader).await?;
        delegation::ensure_for_application(&mut *tx, id).await?;
        ids.push(id);
    }
    let created = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ANY($1) ORDER BY id")
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(created)
}

/// Write only the provided fields. `None` when the id does not exist.
pub async fn update(pool: &PgPool, id: i64, input: &ApplicationInput) -> Result<Option<Application>, sqlx::Error> {
    if input.is_empty() {
        return find_by_id(pool, id).await;
    }
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE applications SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(dtn) = input.dtn {
            set.push("dtn = ").push_bind_unseparated(dtn);
        }
        if let Some(is_in_pm) = input.is_in_pm {
            set.push("is_in_pm = ").push_bind_unseparated(is_in_pm);
        }
        for (col, value) in input.details.provided() {
            set.push(format!("{col} = ")).push_bind_unseparated(value.to_string());
        }
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING *");
    qb.build_query_as::<Application>().fetch_optional(pool).await
}

pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE applications SET trash = 'deleted', trash_date = $2 WHERE id = $1")
        .bind(id)
        .bind(Local::now().naive_local())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove the row; the delegation record and log entries cascade.
pub async fn hard_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn restore(pool: &PgPool, id: i64) -> Result<Option<Application>, sqlx::Error> {
    sqlx::query_as::<_, Application>(
        "UPDATE applications SET trash = NULL, trash_date = NULL WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

fn where_or_validation(criteria: &ListCriteria) -> Result<(String, Vec<String>), AppError> {
    filter::build_where(criteria).map_err(|e| AppError::Validation(e.to_string()))
}

/// One page of listing rows plus the unpaginated total.
pub async fn find_page(pool: &PgPool, criteria: &ListCriteria) -> Result<(Vec<ApplicationListItem>, i64), AppError> {
    let (where_sql, params) = where_or_validation(criteria)?;

    let count_sql = format!("SELECT COUNT(*) {FROM_LISTING} WHERE {where_sql}");
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    for p in &params {
        count_query = count_query.bind(p);
    }
    let (total,) = count_query.fetch_one(pool).await?;

    let data_sql = format!(
        "SELECT a.* {FROM_LISTING} WHERE {where_sql} ORDER BY {} LIMIT {} OFFSET {}",
        filter::order_clause(&criteria.sort),
        criteria.page_size,
        criteria.offset(),
    );
    let mut data_query = sqlx::query_as::<_, Application>(&data_sql);
    for p in &params {
        data_query = data_query.bind(p);
    }
    let applications = data_query.fetch_all(pool).await?;

    Ok((with_delegations(pool, applications).await?, total))
}

/// Every row matching the criteria, ignoring pagination.
pub async fn find_all(pool: &PgPool, criteria: &ListCriteria) -> Result<Vec<ApplicationListItem>, AppError> {
    let (where_sql, params) = where_or_validation(criteria)?;
    let sql = format!(
        "SELECT a.* {FROM_LISTING} WHERE {where_sql} ORDER BY {}",
        filter::order_clause(&criteria.sort),
    );
    let mut query = sqlx::query_as::<_, Application>(&sql);
    for p in &params {
        query = query.bind(p);
    }
    let applications = query.fetch_all(pool).await?;
    Ok(with_delegations(pool, applications).await?)
}

/// One application with its delegation view, trashed or not.
pub async fn find_item(pool: &PgPool, id: i64) -> Result<Option<ApplicationListItem>, sqlx::Error> {
    let Some(application) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    Ok(with_delegations(pool, vec![application]).await?.pop())
}

async fn with_delegations(pool: &PgPool, applications: Vec<Application>) -> Result<Vec<ApplicationListItem>, sqlx::Error> {
    let ids: Vec<i64> = applications.iter().map(|a| a.id).collect();
    let mut by_app: HashMap<i64, _> = delegation::find_by_applications(pool, &ids)
        .await?
        .into_iter()
        .map(|d| (d.application_id, d))
        .collect();
    Ok(applications
        .into_iter()
        .map(|application| {
            let record = by_app.remove(&application.id);
            ApplicationListItem {
                is_decked: record.as_ref().is_some_and(|d| d.is_decked()),
                delegation: record.map(|d| d.view()),
                application,
            }
        })
        .collect())
}

pub async fn summary(pool: &PgPool) -> Result<ApplicationSummary, sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM applications WHERE trash IS NULL")
        .fetch_one(pool)
        .await?;
    let by_status = sqlx::query_as::<_, LabelCount>(
        "SELECT COALESCE(NULLIF(app_status, ''), 'Unknown') AS label, COUNT(*) AS count \
         FROM applications WHERE trash IS NULL GROUP BY 1 ORDER BY 2 DESC, 1",
    )
    .fetch_all(pool)
    .await?;
    let by_category = sqlx::query_as::<_, LabelCount>(
        "SELECT COALESCE(NULLIF(est_cat, ''), 'Unknown') AS label, COUNT(*) AS count \
         FROM applications WHERE trash IS NULL GROUP BY 1 ORDER BY 2 DESC, 1",
    )
    .fetch_all(pool)
    .await?;
    let (recent_uploads,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM applications \
         WHERE trash IS NULL AND date_excel_upload >= NOW() - INTERVAL '7 days'",
    )
    .fetch_one(pool)
    .await?;

    let mut by_stage = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        let completed = delegation::count_in_state(pool, stage, StageState::Completed).await?;
        by_stage.push(StageCount { stage, completed });
    }

    Ok(ApplicationSummary { total, by_status, by_category, by_stage, recent_uploads })
}

/// Distinct non-empty values of a descriptive column. `None` when the field
/// is not filterable.
pub async fn distinct_values(pool: &PgPool, field: &str) -> Result<Option<Vec<String>>, sqlx::Error> {
    let key = field.trim().to_ascii_lowercase();
    let key = key.strip_prefix("db_").unwrap_or(&key);
    let column = match ApplicationDetails::FIELDS.iter().find(|(name, _, _)| *name == key) {
        Some((name, _, _)) => *name,
        None if key == "user_uploader" => "user_uploader",
        None => return Ok(None),
    };
    let rows: Vec<(String,)> = sqlx::query_as(&format!(
        "SELECT DISTINCT {column} FROM applications \
         WHERE trash IS NULL AND {column} IS NOT NULL AND BTRIM({column}) <> '' ORDER BY 1"
    ))
    .fetch_all(pool)
    .await?;
    Ok(Some(rows.into_iter().map(|r| r.0).collect()))
}

async fn count_received(
    pool: &PgPool,
    at: ReceivedAt,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<i64, sqlx::Error> {
    let col = at.column();
    let date = format!("TO_DATE(SUBSTRING({col} FROM 1 FOR 10), 'YYYY-MM-DD')");
    let (count,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM applications \
         WHERE trash IS NULL \
           AND {col} ~ '^[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}' \
           AND EXTRACT(YEAR FROM {date}) = $1 \
           AND ($2::INT IS NULL OR EXTRACT(MONTH FROM {date}) = $2) \
           AND ($3::INT IS NULL OR EXTRACT(DAY FROM {date}) = $3)"
    ))
    .bind(year)
    .bind(month.map(|m| m as i32))
    .bind(day.map(|d| d as i32))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Applications received at FDAC and at central records in the period.
pub async fn received_counts(
    pool: &PgPool,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<ReceivedCounts, sqlx::Error> {
    Ok(ReceivedCounts {
        year,
        month,
        day,
        fdac: count_received(pool, ReceivedAt::Fdac, year, month, day).await?,
        central: count_received(pool, ReceivedAt::Central, year, month, day).await?,
    })
}
