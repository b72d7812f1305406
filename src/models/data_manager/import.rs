use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use sqlx::{Acquire, PgConnection, PgPool};

use super::columns::{self, StageField, Target};
use super::types::{ImportOutcome, ImportRow, ParsedRow};
use crate::errors::AppError;
use crate::models::delegation::{self, Stage, StageState, is_meaningful_actor};
use crate::models::application;

/// Read the first worksheet of an `.xlsx` upload. Row 1 is the header row;
/// fully empty data rows are skipped.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<ParsedRow>, AppError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| AppError::Excel(format!("Could not open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Excel("Workbook has no worksheets".to_string()))?
        .map_err(|e| AppError::Excel(format!("Could not read worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let targets: Vec<Option<Target>> = header
        .iter()
        .map(|cell| {
            let name = columns::cell_text(cell)?;
            let target = columns::resolve_header(&name);
            if target.is_none() {
                log::debug!("Ignoring unknown import column {name:?}");
            }
            target
        })
        .collect();
    if !targets.iter().any(Option::is_some) {
        return Err(AppError::Excel("No recognizable columns in the header row".to_string()));
    }

    Ok(rows
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| columns::cell_text(c).is_some()))
        .map(|(index, cells)| ParsedRow {
            row_number: index + 2,
            result: build_row(&targets, cells),
        })
        .collect())
}

fn build_row(targets: &[Option<Target>], cells: &[Data]) -> Result<ImportRow, String> {
    let mut row = ImportRow::default();
    for (target, cell) in targets.iter().zip(cells) {
        let Some(target) = target else { continue };
        match *target {
            Target::Dtn => row.application.dtn = columns::cell_integer(cell, "dtn")?,
            Target::IsInPm => {
                row.application.is_in_pm = columns::cell_integer(cell, "is_in_pm")?
                    .map(|v| i16::try_from(v).map_err(|_| format!("is_in_pm: {v} is out of range")))
                    .transpose()?;
            }
            Target::Detail(column, kind) => {
                row.application.details.set(column, columns::coerce_detail(cell, kind));
            }
            Target::DateDecked => row.delegation.date_decked = columns::cell_timestamp(cell),
            Target::Stage(stage, field) => {
                let slot = row.delegation.stage_mut(stage);
                match field {
                    StageField::Actor => slot.actor = columns::cell_text(cell),
                    StageField::Decision => slot.decision = columns::cell_text(cell),
                    StageField::Remarks => slot.remarks = columns::cell_text(cell),
                    StageField::End => slot.completed_at = columns::cell_timestamp(cell),
                }
            }
        }
    }
    // Imported history: a named actor with a recorded decision counts as done.
    for stage in Stage::ALL {
        let slot = row.delegation.stage_mut(stage);
        let decided = slot.decision.as_deref().is_some_and(|d| !d.trim().is_empty());
        slot.state = if is_meaningful_actor(slot.actor.as_deref()) && decided {
            StageState::Completed
        } else {
            StageState::Pending
        };
    }
    Ok(row)
}

async fn insert_row(conn: &mut PgConnection, row: &mut ImportRow, uploader: &str) -> Result<(), sqlx::Error> {
    let id = application::insert(&mut *conn, &row.application, Some(uploader)).await?;
    row.delegation.application_id = id;
    delegation::insert(conn, &row.delegation).await?;
    Ok(())
}

/// Insert parsed rows in one transaction, each under its own savepoint so a
/// failing row is rolled back without losing the others.
pub async fn import_rows(pool: &PgPool, rows: Vec<ParsedRow>, uploader: &str) -> Result<ImportOutcome, sqlx::Error> {
    let mut outcome = ImportOutcome::new(rows.len());
    let mut tx = pool.begin().await?;

    for parsed in rows {
        let mut row = match parsed.result {
            Ok(row) => row,
            Err(reason) => {
                outcome.record_failure(parsed.row_number, reason);
                continue;
            }
        };
        let mut savepoint = tx.begin().await?;
        match insert_row(&mut *savepoint, &mut row, uploader).await {
            Ok(()) => {
                savepoint.commit().await?;
                outcome.imported += 1;
            }
            Err(e) => {
                savepoint.rollback().await?;
                log::warn!("Import row {} failed: {e}", parsed.row_number);
                outcome.record_failure(parsed.row_number, e.to_string());
            }
        }
    }

    tx.commit().await?;
    let outcome = outcome.finish();
    log::info!(
        "Excel import by {uploader}: {} of {} rows imported, {} failed",
        outcome.imported,
        outcome.total_rows,
        outcome.failed
    );
    Ok(outcome)
}
