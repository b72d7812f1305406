pub mod analytics_handlers;
pub mod application_handlers;
pub mod auth_handlers;
pub mod data_handlers;
pub mod deck_handlers;
pub mod evaluation_handlers;
pub mod log_handlers;
pub mod stage_handlers;
pub mod user_handlers;
mod workflow_support;

use actix_web::{HttpResponse, error, middleware::from_fn, web};

use crate::auth::middleware::{require_admin, require_auth, require_json_content_type, require_superadmin};
use crate::responses::ApiErrorResponse;

/// Upper bound on an uploaded workbook.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const MAX_JSON_BYTES: usize = 2 * 1024 * 1024;

fn bad_request(error: &str, details: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiErrorResponse {
        error: error.to_string(),
        details: Some(details),
    })
}

/// JSON bodies that fail to parse answer 400 in the common error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _req| {
            let response = bad_request("Invalid JSON body", err.to_string());
            error::InternalError::from_response(err, response).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request("Invalid query string", err.to_string());
        error::InternalError::from_response(err, response).into()
    })
}

/// Register every route. Literal segments are registered before `{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES));

    cfg.service(
        web::scope("/api/auth")
            .wrap(from_fn(require_json_content_type))
            .route("/register", web::post().to(auth_handlers::register))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/me", web::get().to(auth_handlers::me))
            .route("/me", web::put().to(auth_handlers::update_me)),
    );

    // Account administration. Registered ahead of the general `/api` scope.
    cfg.service(
        web::scope("/api/admin")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_admin))
            .wrap(from_fn(require_auth))
            .route("/users", web::get().to(user_handlers::list))
            .service(
                web::resource("/users/{id}")
                    .wrap(from_fn(require_superadmin))
                    .route(web::delete().to(user_handlers::delete)),
            ),
    );

    // Raw workbook bytes; exempt from the JSON content-type guard.
    cfg.service(
        web::scope("/api/main-db/import")
            .wrap(from_fn(require_auth))
            .route("", web::post().to(data_handlers::import)),
    );

    cfg.service(
        web::scope("/api")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .service(
                web::scope("/main-db")
                    .route("", web::get().to(application_handlers::list))
                    .route("", web::post().to(application_handlers::create))
                    .route("/bulk", web::post().to(application_handlers::bulk_create))
                    .route("/summary", web::get().to(application_handlers::summary))
                    .route("/export", web::get().to(data_handlers::export))
                    .route("/filters/{field}", web::get().to(application_handlers::filter_values))
                    .route("/{id}", web::get().to(application_handlers::read))
                    .route("/{id}", web::put().to(application_handlers::update))
                    .route("/{id}", web::delete().to(application_handlers::delete))
                    .route("/{id}/restore", web::post().to(application_handlers::restore)),
            )
            .route("/analytics/received", web::get().to(analytics_handlers::received))
            .service(
                web::scope("/deck")
                    .route("/single/{id}", web::patch().to(deck_handlers::deck_single))
                    .route("/bulk", web::patch().to(deck_handlers::deck_bulk))
                    .route("/decked", web::get().to(deck_handlers::decked))
                    .route("/not-decked", web::get().to(deck_handlers::not_decked))
                    .route("/{id}", web::get().to(deck_handlers::details)),
            )
            .service(
                web::scope("/evaluation")
                    .route("/single/{id}", web::patch().to(evaluation_handlers::evaluate_single))
                    .route("/bulk", web::patch().to(evaluation_handlers::evaluate_bulk))
                    .route("/status/{id}", web::get().to(evaluation_handlers::status)),
            )
            .service(
                web::scope("/workflow")
                    .route("/{stage}/single/{id}", web::patch().to(stage_handlers::complete_single))
                    .route("/{stage}/bulk", web::patch().to(stage_handlers::complete_bulk))
                    .route("/{id}", web::get().to(stage_handlers::view)),
            )
            .service(
                web::scope("/application-logs")
                    .route("", web::post().to(log_handlers::create))
                    .route("", web::get().to(log_handlers::search))
                    .route("/bulk", web::post().to(log_handlers::create_bulk))
                    .route("/main-db/{id}", web::get().to(log_handlers::by_application))
                    .route("/main-db/{id}/step/{step}", web::get().to(log_handlers::by_step))
                    .route("/{log_id}", web::get().to(log_handlers::read)),
            ),
    );
}
