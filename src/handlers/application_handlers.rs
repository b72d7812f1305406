use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::application::{self, ApplicationInput, ListQuery};
use crate::responses::{ActionResponse, PaginatedResponse};
use crate::workflow::MAX_BULK_IDS;

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard_delete: bool,
}

/// GET /api/main-db - Paginated, filtered, sorted listing
pub async fn list(
    pool: web::Data<PgPool>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let criteria = query.into_inner().into_criteria().map_err(AppError::Validation)?;
    let (data, total) = application::find_page(&pool, &criteria).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, total, criteria.page, criteria.page_size)))
}

/// GET /api/main-db/summary
pub async fn summary(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(application::summary(&pool).await?))
}

/// GET /api/main-db/filters/{field} - Distinct values of a filterable column
pub async fn filter_values(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let field = path.into_inner();
    let values = application::distinct_values(&pool, &field)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown filter field '{field}'")))?;
    Ok(HttpResponse::Ok().json(json!({ "field": field, "values": values })))
}

/// GET /api/main-db/{id}
pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let item = application::find_item(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application record with id {id} not found")))?;
    Ok(HttpResponse::Ok().json(item))
}

/// POST /api/main-db - Create an application and its empty delegation record
pub async fn create(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Json<ApplicationInput>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner();
    if input.is_empty() {
        return Err(AppError::Validation("At least one field is required".to_string()));
    }
    let created = application::create(&pool, &input, Some(&current.username)).await?;
    log::info!("Application {} created by {}", created.id, current.username);
    Ok(HttpResponse::Created().json(created))
}

/// POST /api/main-db/bulk - Create many applications in one transaction
pub async fn bulk_create(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Json<Vec<ApplicationInput>>,
) -> Result<HttpResponse, AppError> {
    let inputs = body.into_inner();
    if inputs.is_empty() {
        return Err(AppError::Validation("At least one record is required".to_string()));
    }
    if inputs.len() > MAX_BULK_IDS {
        return Err(AppError::Validation(format!("At most {MAX_BULK_IDS} records per request")));
    }
    if let Some(pos) = inputs.iter().position(ApplicationInput::is_empty) {
        return Err(AppError::Validation(format!("Record {} has no fields", pos + 1)));
    }
    let created = application::create_many(&pool, &inputs, Some(&current.username)).await?;
    log::info!("{} applications created by {}", created.len(), current.username);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "created_count": created.len(),
        "data": created,
    })))
}

/// PUT /api/main-db/{id} - Update only the fields present in the body
pub async fn update(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<ApplicationInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let updated = application::update(&pool, id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application record with id {id} not found")))?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/main-db/{id}?hard_delete=bool - Trash, or remove permanently
pub async fn delete(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    path: web::Path<i64>,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let removed = if query.hard_delete {
        application::hard_delete(&pool, id).await?
    } else {
        application::soft_delete(&pool, id).await?
    };
    if !removed {
        return Err(AppError::NotFound(format!("Application record with id {id} not found")));
    }

    let message = if query.hard_delete {
        log::warn!("Application {id} permanently deleted by {}", current.username);
        "Application permanently deleted"
    } else {
        log::info!("Application {id} moved to trash by {}", current.username);
        "Application moved to trash"
    };
    Ok(HttpResponse::Ok().json(ActionResponse {
        success: true,
        message: message.to_string(),
        updated_count: 1,
    }))
}

/// POST /api/main-db/{id}/restore - Take a record out of the trash
pub async fn restore(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let restored = application::restore(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application record with id {id} not found")))?;
    Ok(HttpResponse::Ok().json(restored))
}
