use serde::Deserialize;

use super::WorkflowError;

fn required(value: &str, name: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::Validation(format!("{name} is required")));
    }
    Ok(())
}

/// Body of the deck actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeckRequest {
    #[serde(default)]
    pub decker: String,
    #[serde(default)]
    pub evaluator: String,
    #[serde(default, rename = "deckerDecision", alias = "decker_decision")]
    pub decker_decision: String,
    #[serde(default, rename = "deckerRemarks", alias = "decker_remarks")]
    pub decker_remarks: Option<String>,
    #[serde(default, rename = "dateDeckedEnd", alias = "date_decked_end")]
    pub date_decked_end: Option<String>,
}

impl DeckRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        required(&self.decker, "decker")?;
        required(&self.evaluator, "evaluator")?;
        required(&self.decker_decision, "deckerDecision")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDeckRequest {
    #[serde(default)]
    pub record_ids: Vec<i64>,
    #[serde(flatten)]
    pub deck: DeckRequest,
}

/// Body of the evaluation actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub evaluator: String,
    #[serde(default)]
    pub eval_decision: String,
    #[serde(default)]
    pub eval_remarks: Option<String>,
    #[serde(default)]
    pub date_eval_end: Option<String>,
    /// Checker to assign; absent or null clears the assignment.
    #[serde(default)]
    pub checker: Option<String>,
}

impl EvaluationRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        required(&self.evaluator, "evaluator")?;
        required(&self.eval_decision, "eval_decision")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkEvaluationRequest {
    #[serde(default)]
    pub record_ids: Vec<i64>,
    #[serde(flatten)]
    pub evaluation: EvaluationRequest,
}

/// Body of the generic stage actions (Checker through Releasing Officer).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageRequest {
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub decision: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub date_end: Option<String>,
    /// Actor to assign to the following stage; absent or null clears it.
    #[serde(default)]
    pub next_actor: Option<String>,
}

impl StageRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        required(&self.actor, "actor")?;
        required(&self.decision, "decision")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkStageRequest {
    #[serde(default)]
    pub record_ids: Vec<i64>,
    #[serde(flatten)]
    pub action: StageRequest,
}
