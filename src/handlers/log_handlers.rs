use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::{application, application_log};
use crate::models::application_log::{LogSearchQuery, MAX_BULK_ENTRIES, NewLogEntry};

fn stamp_author(entry: &mut NewLogEntry, current: &CurrentUser) {
    if entry.user_name.as_deref().is_none_or(|u| u.trim().is_empty()) {
        entry.user_name = Some(current.username.clone());
    }
}

async fn ensure_application(pool: &PgPool, id: i64) -> Result<(), AppError> {
    match application::find_by_id(pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Application record with id {id} not found"))),
    }
}

/// POST /api/application-logs - Append one entry to the log trail
pub async fn create(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Json<NewLogEntry>,
) -> Result<HttpResponse, AppError> {
    let mut entry = body.into_inner();
    stamp_author(&mut entry, &current);
    ensure_application(&pool, entry.application_id).await?;
    let created = application_log::insert(pool.get_ref(), &entry).await?;
    Ok(HttpResponse::Created().json(created))
}

/// POST /api/application-logs/bulk - Append up to 100 entries, all or nothing
pub async fn create_bulk(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Json<Vec<NewLogEntry>>,
) -> Result<HttpResponse, AppError> {
    let mut entries = body.into_inner();
    if entries.is_empty() {
        return Err(AppError::Validation("At least one log entry is required".to_string()));
    }
    if entries.len() > MAX_BULK_ENTRIES {
        return Err(AppError::Validation(format!(
            "At most {MAX_BULK_ENTRIES} log entries per request"
        )));
    }
    if let Some(bad) = entries.iter().find(|e| e.application_id <= 0) {
        return Err(AppError::Validation(format!("Invalid application id {}", bad.application_id)));
    }
    for entry in &mut entries {
        stamp_author(entry, &current);
    }
    let created = application_log::insert_many(&pool, &entries).await.map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_foreign_key_violation()) {
            AppError::Validation("One or more entries reference an unknown application".to_string())
        } else {
            AppError::Db(e)
        }
    })?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "created_count": created.len(),
        "data": created,
    })))
}

/// GET /api/application-logs/main-db/{id} - Trail of one application, newest first
pub async fn by_application(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_application(&pool, id).await?;
    Ok(HttpResponse::Ok().json(application_log::find_by_application(&pool, id).await?))
}

/// GET /api/application-logs/main-db/{id}/step/{step}
pub async fn by_step(
    pool: web::Data<PgPool>,
    path: web::Path<(i64, String)>,
) -> Result<HttpResponse, AppError> {
    let (id, step) = path.into_inner();
    ensure_application(&pool, id).await?;
    let entries = application_log::find_by_application_and_step(&pool, id, &step).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// GET /api/application-logs/{log_id}
pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let log_id = path.into_inner();
    let entry = application_log::find_by_id(&pool, log_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Log entry {log_id} not found")))?;
    Ok(HttpResponse::Ok().json(entry))
}

/// GET /api/application-logs?step&user&from&to&limit
pub async fn search(
    pool: web::Data<PgPool>,
    query: web::Query<LogSearchQuery>,
) -> Result<HttpResponse, AppError> {
    let criteria = query.into_inner().into_search().map_err(AppError::Validation)?;
    Ok(HttpResponse::Ok().json(application_log::search(&pool, &criteria).await?))
}
