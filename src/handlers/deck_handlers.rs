use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::workflow_support::{now, run_bulk, run_single};
use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::delegation::{self, DeckSummary, Stage};
use crate::responses::ActionResponse;
use crate::workflow::{BulkDeckRequest, DeckRequest, WorkflowEngine, WorkflowError};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct DeckListQuery {
    pub evaluator: Option<String>,
    pub decker: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl DeckListQuery {
    fn window(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        (skip, limit)
    }
}

#[derive(Debug, Serialize)]
struct DeckDetails {
    #[serde(flatten)]
    summary: DeckSummary,
    is_decked: bool,
}

/// PATCH /api/deck/single/{id} - Assign an evaluator to one application
pub async fn deck_single(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    path: web::Path<i64>,
    body: web::Json<DeckRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    body.validate()?;
    let outcome = run_single(&pool, id, |record| engine.deck(record, &body, &current.username, now())).await?;
    Ok(HttpResponse::Ok().json(ActionResponse {
        success: true,
        message: outcome.message,
        updated_count: 1,
    }))
}

/// PATCH /api/deck/bulk - Deck many applications; failures are reported per id
pub async fn deck_bulk(
    pool: web::Data<PgPool>,
    engine: web::Data<WorkflowEngine>,
    current: CurrentUser,
    body: web::Json<BulkDeckRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.deck.validate()?;
    let at = now();
    let report = run_bulk(&pool, Stage::Decker, &body.record_ids, |record| {
        engine.deck(record, &body.deck, &current.username, at)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /api/deck/decked?evaluator&decker&skip&limit
pub async fn decked(
    pool: web::Data<PgPool>,
    query: web::Query<DeckListQuery>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = query.window();
    let evaluator = query.evaluator.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let decker = query.decker.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let records = delegation::find_decked(&pool, evaluator, decker, skip, limit).await?;
    let rows: Vec<DeckSummary> = records.iter().map(DeckSummary::from).collect();
    Ok(HttpResponse::Ok().json(rows))
}

/// GET /api/deck/not-decked?skip&limit
pub async fn not_decked(
    pool: web::Data<PgPool>,
    query: web::Query<DeckListQuery>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = query.window();
    let records = delegation::find_not_decked(&pool, skip, limit).await?;
    let rows: Vec<DeckSummary> = records.iter().map(DeckSummary::from).collect();
    Ok(HttpResponse::Ok().json(rows))
}

/// GET /api/deck/{id} - Deck state of one application
pub async fn details(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = delegation::find_by_application(pool.get_ref(), id)
        .await?
        .ok_or(WorkflowError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(DeckDetails {
        summary: DeckSummary::from(&record),
        is_decked: record.is_decked(),
    }))
}
