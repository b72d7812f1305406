use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;

use crate::auth::session::{self, CurrentUser};
use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::models::user::{self, LoginRequest, NewUser, ProfileUpdate, RegisterRequest, Role, UserResponse};

/// POST /api/auth/register - Create a regular user account
pub async fn register(
    pool: web::Data<PgPool>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    validate::check_registration(&body).map_err(AppError::Validation)?;
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_string();

    if user::exists(&pool, &username, &email).await? {
        return Err(AppError::Validation("Username or email is already registered".to_string()));
    }

    let password_hash = password::hash_password(&body.password)?;
    let id = user::create(
        &pool,
        &NewUser {
            username,
            email,
            password_hash,
            first_name: body.first_name.trim().to_string(),
            surname: body.surname.trim().to_string(),
            position: body.position.filter(|p| !p.trim().is_empty()),
            role: Role::User,
        },
    )
    .await?;

    let created = user::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    log::info!("Registered user '{}' (id={id})", created.username);
    Ok(HttpResponse::Created().json(UserResponse::from(created)))
}

/// POST /api/auth/login - Verify credentials and start a session
pub async fn login(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let Some(found) = user::find_by_username(&pool, body.username.trim()).await? else {
        log::warn!("Login attempt for unknown user '{}'", body.username.trim());
        return Err(invalid());
    };
    if !password::verify_password(&body.password, &found.password_hash)? {
        log::warn!("Failed login for '{}'", found.username);
        return Err(invalid());
    }
    if !found.is_active {
        return Err(AppError::Unauthorized("Account is inactive".to_string()));
    }

    session::sign_in(&session, found.id, &found.username, Role::parse(&found.role))?;
    log::info!("User '{}' logged in", found.username);
    Ok(HttpResponse::Ok().json(UserResponse::from(found)))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> HttpResponse {
    session::sign_out(&session);
    HttpResponse::Ok().json(json!({ "success": true, "message": "Logged out" }))
}

/// GET /api/auth/me - The user behind the current session
pub async fn me(pool: web::Data<PgPool>, current: CurrentUser) -> Result<HttpResponse, AppError> {
    let found = user::find_by_id(&pool, current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session user no longer exists".to_string()))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(found)))
}

/// PUT /api/auth/me - Update the caller's own profile
pub async fn update_me(
    pool: web::Data<PgPool>,
    current: CurrentUser,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let update = body.into_inner();
    if update.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    validate::check_profile(&update).map_err(AppError::Validation)?;
    let password_hash = update.password.as_deref().map(password::hash_password).transpose()?;

    let updated = user::update_profile(&pool, current.id, &update, password_hash.as_deref())
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::Validation("Email is already registered".to_string())
            } else {
                AppError::Db(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    log::info!("User '{}' updated their profile", updated.username);
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}
