//! Load-mutate-persist plumbing shared by the deck, evaluation and stage handlers.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::delegation::{self, Delegation, Stage};
use crate::models::application_log;
use crate::responses::BulkResponse;
use crate::workflow::{BulkReport, StageOutcome, WorkflowError, apply_bulk, validate_record_ids};

pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Apply `action` to one record and persist it with its log entry in a
/// single transaction.
pub(crate) async fn run_single<F>(pool: &PgPool, application_id: i64, action: F) -> Result<StageOutcome, AppError>
where
    F: FnOnce(&mut Delegation) -> Result<StageOutcome, WorkflowError>,
{
    let mut tx = pool.begin().await?;
    let mut record = delegation::find_by_application(&mut *tx, application_id)
        .await?
        .ok_or(WorkflowError::NotFound(application_id))?;
    let outcome = action(&mut record)?;
    delegation::save(&mut *tx, &record).await?;
    application_log::insert(&mut *tx, &outcome.log).await?;
    tx.commit().await?;
    log::info!(
        "{} stage completed for application {application_id} by {}",
        outcome.stage.label(),
        outcome.log.user_name.as_deref().unwrap_or("unknown")
    );
    Ok(outcome)
}

/// Validate the ids, apply `action` to each record and commit all successes
/// together. A failed commit reports every id as failed.
pub(crate) async fn run_bulk<F>(pool: &PgPool, stage: Stage, ids: &[i64], action: F) -> Result<BulkResponse, AppError>
where
    F: FnMut(&mut Delegation) -> Result<StageOutcome, WorkflowError>,
{
    validate_record_ids(ids)?;
    match persist_bulk(pool, ids, action).await {
        Ok(report) => {
            log::info!(
                "Bulk {} action: {} updated, {} failed",
                stage.label(),
                report.updated_count(),
                report.failed_count()
            );
            Ok(BulkResponse::from_report(stage, &report))
        }
        Err(e) => {
            log::error!("Bulk {} transaction failed: {e}", stage.label());
            Err(AppError::TransactionFailed(BulkResponse::transaction_failed(ids, &e.to_string())))
        }
    }
}

async fn persist_bulk<F>(pool: &PgPool, ids: &[i64], action: F) -> Result<BulkReport, sqlx::Error>
where
    F: FnMut(&mut Delegation) -> Result<StageOutcome, WorkflowError>,
{
    let mut tx = pool.begin().await?;
    let mut records: HashMap<i64, Delegation> = delegation::find_by_applications(&mut *tx, ids)
        .await?
        .into_iter()
        .map(|d| (d.application_id, d))
        .collect();
    let report = apply_bulk(ids, &mut records, action);
    for outcome in &report.outcomes {
        if let Some(record) = records.get(&outcome.application_id) {
            delegation::save(&mut *tx, record).await?;
        }
        application_log::insert(&mut *tx, &outcome.log).await?;
    }
    tx.commit().await?;
    Ok(report)
}
