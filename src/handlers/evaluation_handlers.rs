use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::PgPool;

use super::workflow_support::{now, run_bulk, run_single};
use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::delegation::{self, Delegation, Stage};
use crate::responses::ActionResponse;
use crate::workflow::{BulkEvaluationRequest, EvaluationRequest, WorkflowEngine, WorkflowError};

#[derive(Debug, Serialize)]
pub struct EvaluationStatus {
    pub id: i64,
    pub is_decked: bool,
    pub is_evaluated: bool,
    pub evaluator: Option<String>,
    pub eval_decision: Option<String>,
    pub eval_remarks: Option<String>,
    pub date_eval_end: Option<NaiveDateTime>,
    pub checker: Option<String>,
}

impl From<&Delegation> for EvaluationStatus {
    fn from(d: &Delegation) -> Self {
        let eval = d.stage(Stage::Evaluator);
        EvaluationStatus {
            id: d.application_id,
            is_decked: d.is_decked(),
            is_evaluated: d.is_evaluated(),
            evaluator: eval.actor.clone(),
            eval_decision: eval.decision.clone(),
            eval_remarks: eval.remarks.clone(),
            date_eval_end: eval.completed_at,
            checker: d.stage(Stage::Checker).actor.clone(),
        }
    }
}

/// PATCH /api/evaluation/single/{id} - Record the evaluation of one application
pub async fn evaluate_single(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    path: web::Path<i64>,
    body: web::Json<EvaluationRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    body.validate()?;
    let outcome = run_single(&pool, id, |record| engine.evaluate(record, &body, &current.username, now())).await?;
    Ok(HttpResponse::Ok().json(ActionResponse {
        success: true,
        message: outcome.message,
        updated_count: 1,
    }))
}

/// PATCH /api/evaluation/bulk
pub async fn evaluate_bulk(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    body: web::Json<BulkEvaluationRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.evaluation.validate()?;
    let at = now();
    let report = run_bulk(&pool, Stage::Evaluator, &body.record_ids, |record| {
        engine.evaluate(record, &body.evaluation, &current.username, at)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /api/evaluation/status/{id}
pub async fn status(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = delegation::find_by_application(pool.get_ref(), id)
        .await?
        .ok_or(WorkflowError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(EvaluationStatus::from(&record)))
}
