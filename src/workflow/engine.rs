use chrono::{NaiveDate, NaiveDateTime};

use super::WorkflowError;
use super::requests::{DeckRequest, EvaluationRequest, StageRequest};
use crate::config::WorkflowConfig;
use crate::models::application_log::NewLogEntry;
use crate::models::delegation::{Delegation, Stage, StageState, is_meaningful_actor};

/// Result of one successful stage action on one record.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub application_id: i64,
    pub dtn: Option<i64>,
    pub stage: Stage,
    pub message: String,
    /// Who held the following stage before this action, if anyone meaningful.
    pub previous_assignee: Option<String>,
    /// Who holds the following stage after this action.
    pub assignee: Option<String>,
    /// Log trail entry to append alongside the state change.
    pub log: NewLogEntry,
}

/// Stage transition rules. Holds no state besides configuration and never
/// touches the database; callers load and persist the records.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowEngine {
    strict_ordering: bool,
}

impl WorkflowEngine {
    pub fn new(config: &WorkflowConfig) -> Self {
        WorkflowEngine { strict_ordering: config.strict_ordering }
    }

    pub fn strict_ordering(&self) -> bool {
        self.strict_ordering
    }

    /// Assign an evaluator and complete the Decker stage. Re-decking overwrites.
    pub fn deck(
        &self,
        record: &mut Delegation,
        req: &DeckRequest,
        username: &str,
        now: NaiveDateTime,
    ) -> Result<StageOutcome, WorkflowError> {
        req.validate()?;
        let completed_at = parse_stage_date(req.date_decked_end.as_deref(), now);
        complete(
            record,
            Stage::Decker,
            &req.decker,
            &req.decker_decision,
            req.decker_remarks.as_deref(),
            completed_at,
        );
        record.date_decked = Some(now);
        let previous = assign(record, Stage::Evaluator, Some(&req.evaluator));

        let dtn = record.dtn.map_or_else(|| "N/A".to_string(), |d| d.to_string());
        let mut message = format!("Application (DTN: {dtn}) decked successfully");
        if let Some(prev) = &previous {
            message.push_str(&format!(" (was previously decked by: {prev})"));
        }
        Ok(outcome(record, Stage::Decker, username, message, previous))
    }

    /// Complete the Evaluator stage and assign (or clear) the checker.
    pub fn evaluate(
        &self,
        record: &mut Delegation,
        req: &EvaluationRequest,
        username: &str,
        now: NaiveDateTime,
    ) -> Result<StageOutcome, WorkflowError> {
        req.validate()?;
        self.check_order(record, Stage::Evaluator)?;
        let completed_at = parse_stage_date(req.date_eval_end.as_deref(), now);
        complete(
            record,
            Stage::Evaluator,
            &req.evaluator,
            req.eval_decision.trim(),
            req.eval_remarks.as_deref(),
            completed_at,
        );
        let previous = assign(record, Stage::Checker, req.checker.as_deref());
        let message = "Application evaluated successfully".to_string();
        Ok(outcome(record, Stage::Evaluator, username, message, previous))
    }

    /// Complete one of the stages after evaluation.
    pub fn complete_stage(
        &self,
        stage: Stage,
        record: &mut Delegation,
        req: &StageRequest,
        username: &str,
        now: NaiveDateTime,
    ) -> Result<StageOutcome, WorkflowError> {
        if matches!(stage, Stage::Decker | Stage::Evaluator) {
            return Err(WorkflowError::Validation(format!(
                "The {} stage is completed through its own endpoint",
                stage.label()
            )));
        }
        req.validate()?;
        self.check_order(record, stage)?;
        let completed_at = parse_stage_date(req.date_end.as_deref(), now);
        complete(record, stage, &req.actor, req.decision.trim(), req.remarks.as_deref(), completed_at);
        let previous = match stage.successor() {
            Some(next) => assign(record, next, req.next_actor.as_deref()),
            None => None,
        };
        let message = format!("{} stage completed successfully", stage.label());
        Ok(outcome(record, stage, username, message, previous))
    }

    fn check_order(&self, record: &Delegation, stage: Stage) -> Result<(), WorkflowError> {
        match stage {
            Stage::Decker => Ok(()),
            Stage::Evaluator if !record.stage(Stage::Decker).has_actor() => Err(WorkflowError::NotDecked),
            Stage::Evaluator => Ok(()),
            _ if !self.strict_ordering => Ok(()),
            _ => match stage.predecessor() {
                Some(predecessor) if !record.stage(predecessor).is_completed() => {
                    Err(WorkflowError::PredecessorIncomplete { stage, predecessor })
                }
                _ => Ok(()),
            },
        }
    }
}

fn complete(
    record: &mut Delegation,
    stage: Stage,
    actor: &str,
    decision: &str,
    remarks: Option<&str>,
    completed_at: NaiveDateTime,
) {
    let slot = record.stage_mut(stage);
    slot.actor = Some(actor.trim().to_string());
    slot.decision = Some(decision.to_string());
    slot.remarks = Some(remarks.unwrap_or_default().to_string());
    slot.state = StageState::Completed;
    slot.completed_at = Some(completed_at);
}

/// Set (or clear) only the actor of `stage` and return the previous
/// meaningful actor. Decision, remarks, state and date are left as recorded.
fn assign(record: &mut Delegation, stage: Stage, actor: Option<&str>) -> Option<String> {
    let slot = record.stage_mut(stage);
    let previous = slot.actor.clone().filter(|a| is_meaningful_actor(Some(a)));
    slot.actor = actor.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string);
    previous
}

fn outcome(record: &Delegation, stage: Stage, username: &str, message: String, previous: Option<String>) -> StageOutcome {
    let slot = record.stage(stage);
    let log = NewLogEntry {
        application_id: record.application_id,
        application_step: Some(stage.step_name().to_string()),
        user_name: Some(username.to_string()),
        application_status: Some(stage.status_after().to_string()),
        application_decision: slot.decision.clone(),
        application_remarks: slot.remarks.clone(),
        start_date: stage.predecessor().and_then(|p| record.stage(p).completed_at),
        accomplished_date: slot.completed_at,
    };
    StageOutcome {
        application_id: record.application_id,
        dtn: record.dtn,
        stage,
        message,
        previous_assignee: previous,
        assignee: stage.successor().and_then(|next| record.stage(next).actor.clone()),
        log,
    }
}

/// Completion date from a `YYYY-MM-DD` (or full timestamp) string. Missing
/// or unreadable input falls back to `now`.
pub fn parse_stage_date(raw: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_time(chrono::NaiveTime::MIN);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return ts;
        }
    }
    log::warn!("Unparseable stage date {raw:?}, using current time");
    now
}
