use actix_web::{HttpResponse, web};
use chrono::Local;
use sqlx::PgPool;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::application::{self, ListQuery};
use crate::models::data_manager;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// POST /api/main-db/import - Import applications from raw .xlsx bytes
pub async fn import(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation("Request body must contain an .xlsx workbook".to_string()));
    }
    let rows = data_manager::parse_workbook(&body)?;
    let outcome = data_manager::import_rows(&pool, rows, &current.username).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /api/main-db/export - Every listing row matching the filters as .xlsx
pub async fn export(
    pool: web::Data<PgPool>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let criteria = query.into_inner().into_criteria().map_err(AppError::Validation)?;
    let items = application::find_all(&pool, &criteria).await?;
    let bytes = data_manager::export_workbook(&items)?;
    let filename = format!("applications_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"));
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(("Content-Disposition", format!("attachment; filename=\"{filename}\"")))
        .body(bytes))
}
