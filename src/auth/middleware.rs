use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
};

use crate::auth::session::{self, get_user_id};
use crate::models::user::Role;
use crate::responses::ApiErrorResponse;

/// Rejects requests without an authenticated session with 401.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();

    if get_user_id(&session).is_none() {
        let response = HttpResponse::Unauthorized().json(ApiErrorResponse {
            error: "Not authenticated".to_string(),
            details: None,
        });
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// 403 unless the session role is Admin or SuperAdmin. Wrap inside `require_auth`.
pub async fn require_admin(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    guard_role(req, next, &[Role::Admin, Role::SuperAdmin]).await
}

/// 403 unless the session role is SuperAdmin.
pub async fn require_superadmin(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    guard_role(req, next, &[Role::SuperAdmin]).await
}

async fn guard_role<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
    allowed: &[Role],
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let verdict = session::require_role(&req.get_session(), allowed);
    if let Err(denied) = verdict {
        log::warn!("{} {} refused: {denied}", req.method(), req.path());
        return Ok(req.into_response(denied.error_response()).map_into_right_body());
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// CSRF guard: mutation requests that carry a body must be `application/json`.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    const MUTATIONS: [Method; 4] = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

    if MUTATIONS.contains(req.method()) {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let has_body = req.headers().contains_key("transfer-encoding")
            || req
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() != "0");

        if has_body && !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
