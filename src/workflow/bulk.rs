use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::WorkflowError;
use super::engine::StageOutcome;
use crate::models::delegation::{Delegation, Stage};

pub const MAX_BULK_IDS: usize = 100;

/// Checked before any record is loaded: non-empty, at most
/// [`MAX_BULK_IDS`], unique and positive.
pub fn validate_record_ids(ids: &[i64]) -> Result<(), WorkflowError> {
    if ids.is_empty() {
        return Err(WorkflowError::Validation("record_ids must not be empty".to_string()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(WorkflowError::Validation(format!(
            "Cannot process more than {MAX_BULK_IDS} applications at once. Received {}",
            ids.len()
        )));
    }
    if let Some(bad) = ids.iter().find(|id| **id <= 0) {
        return Err(WorkflowError::Validation(format!("record_ids must be positive integers (got {bad})")));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(WorkflowError::Validation(format!("record_ids contains duplicate id {dup}")));
    }
    Ok(())
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetailStatus {
    Success,
    Failed,
}

/// Per-id line of a bulk report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BulkDetail {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtn: Option<i64>,
    pub status: DetailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_evaluator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkDetail {
    pub fn failed(id: i64, dtn: Option<i64>, reason: impl Into<String>) -> Self {
        BulkDetail {
            id,
            dtn,
            status: DetailStatus::Failed,
            evaluator: None,
            previous_evaluator: None,
            reason: Some(reason.into()),
        }
    }

    fn succeeded(outcome: &StageOutcome) -> Self {
        let decking = outcome.stage == Stage::Decker;
        BulkDetail {
            id: outcome.application_id,
            dtn: outcome.dtn,
            status: DetailStatus::Success,
            evaluator: if decking { outcome.assignee.clone() } else { None },
            previous_evaluator: if decking { outcome.previous_assignee.clone() } else { None },
            reason: None,
        }
    }
}

/// Outcome of applying one action to many records, in request order.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub outcomes: Vec<StageOutcome>,
    pub details: Vec<BulkDetail>,
}

impl BulkReport {
    pub fn updated_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.details.len() - self.outcomes.len()
    }

    pub fn message(&self, stage: Stage) -> String {
        let (updated, failed) = (self.updated_count(), self.failed_count());
        match stage {
            Stage::Decker if failed == 0 => format!("Successfully decked {updated} application(s)"),
            Stage::Decker => format!("Successfully decked {updated} application(s). {failed} failed to update"),
            Stage::Evaluator => format!("Evaluated {updated} record(s), {failed} failed"),
            other => format!("Completed {} stage for {updated} record(s), {failed} failed", other.label()),
        }
    }
}

/// Run `action` against each id's record. Missing ids and rejected actions
/// become failed details; the caller persists the mutated records.
pub fn apply_bulk<F>(ids: &[i64], records: &mut HashMap<i64, Delegation>, mut action: F) -> BulkReport
where
    F: FnMut(&mut Delegation) -> Result<StageOutcome, WorkflowError>,
{
    let mut report = BulkReport::default();
    for id in ids {
        let Some(record) = records.get_mut(id) else {
            report.details.push(BulkDetail::failed(*id, None, "Record not found"));
            continue;
        };
        let dtn = record.dtn;
        // Work on a copy so a rejected action leaves the record untouched.
        let mut candidate = record.clone();
        match action(&mut candidate) {
            Ok(outcome) => {
                *record = candidate;
                report.details.push(BulkDetail::succeeded(&outcome));
                report.outcomes.push(outcome);
            }
            Err(e) => report.details.push(BulkDetail::failed(*id, dtn, e.to_string())),
        }
    }
    report
}
