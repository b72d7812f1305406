//! Checker, Supervisor, QA, Director and Releasing Officer actions, plus the
//! full delegation view. The first two stages have their own handlers.

use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use super::workflow_support::{now, run_bulk, run_single};
use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::delegation::{self, Stage};
use crate::responses::ActionResponse;
use crate::workflow::{BulkStageRequest, StageRequest, WorkflowEngine, WorkflowError};

fn generic_stage(slug: &str) -> Result<Stage, AppError> {
    match Stage::from_slug(slug) {
        Some(Stage::Decker | Stage::Evaluator) | None => {
            Err(AppError::NotFound(format!("Unknown workflow stage '{slug}'")))
        }
        Some(stage) => Ok(stage),
    }
}

/// PATCH /api/workflow/{stage}/single/{id}
pub async fn complete_single(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    path: web::Path<(String, i64)>,
    body: web::Json<StageRequest>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let stage = generic_stage(&slug)?;
    body.validate()?;
    let outcome = run_single(&pool, id, |record| {
        engine.complete_stage(stage, record, &body, &current.username, now())
    })
    .await?;
    Ok(HttpResponse::Ok().json(ActionResponse {
        success: true,
        message: outcome.message,
        updated_count: 1,
    }))
}

/// PATCH /api/workflow/{stage}/bulk
pub async fn complete_bulk(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    path: web::Path<String>,
    body: web::Json<BulkStageRequest>,
) -> Result<HttpResponse, AppError> {
    let stage = generic_stage(&path)?;
    let body = body.into_inner();
    body.action.validate()?;
    let at = now();
    let report = run_bulk(&pool, stage, &body.record_ids, |record| {
        engine.complete_stage(stage, record, &body.action, &current.username, at)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /api/workflow/{id} - Every stage of one application
pub async fn view(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = delegation::find_by_application(pool.get_ref(), id)
        .await?
        .ok_or(WorkflowError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(record.view()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_later_stages_have_generic_routes() {
        assert_eq!(generic_stage("checker").unwrap(), Stage::Checker);
        assert_eq!(generic_stage("releasing").unwrap(), Stage::ReleasingOfficer);
        assert!(generic_stage("decker").is_err());
        assert!(generic_stage("evaluator").is_err());
        assert!(generic_stage("janitor").is_err());
    }
}
