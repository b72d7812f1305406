use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::user::{self, UserResponse};

/// GET /api/admin/users - Every account, oldest first
pub async fn list(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let users: Vec<UserResponse> = user::find_all(&pool)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// DELETE /api/admin/users/{id}
pub async fn delete(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if id == current.id {
        return Err(AppError::Validation("Cannot delete yourself".to_string()));
    }
    if !user::delete(&pool, id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    log::info!("User {id} deleted by '{}'", current.username);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "User deleted successfully" })))
}
