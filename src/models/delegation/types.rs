use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};

/// The seven ordered workflow stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decker,
    Evaluator,
    Checker,
    Supervisor,
    Qa,
    Director,
    ReleasingOfficer,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Decker,
        Stage::Evaluator,
        Stage::Checker,
        Stage::Supervisor,
        Stage::Qa,
        Stage::Director,
        Stage::ReleasingOfficer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column prefix in `application_delegation`.
    pub fn column(self) -> &'static str {
        match self {
            Stage::Decker => "decker",
            Stage::Evaluator => "evaluator",
            Stage::Checker => "checker",
            Stage::Supervisor => "supervisor",
            Stage::Qa => "qa",
            Stage::Director => "director",
            Stage::ReleasingOfficer => "releasing_officer",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Decker => "Decker",
            Stage::Evaluator => "Evaluator",
            Stage::Checker => "Checker",
            Stage::Supervisor => "Supervisor",
            Stage::Qa => "QA",
            Stage::Director => "Director",
            Stage::ReleasingOfficer => "Releasing Officer",
        }
    }

    /// Step name written to the log trail.
    pub fn step_name(self) -> &'static str {
        match self {
            Stage::Decker => "Decking",
            Stage::Evaluator => "Evaluation",
            Stage::Checker => "Checking",
            Stage::Supervisor => "Supervisor",
            Stage::Qa => "QA",
            Stage::Director => "Director",
            Stage::ReleasingOfficer => "Releasing",
        }
    }

    /// Status label an application carries once this stage is completed.
    pub fn status_after(self) -> &'static str {
        match self {
            Stage::Decker => "For Evaluation",
            Stage::Evaluator => "For Checking",
            Stage::Checker => "For Supervisor Review",
            Stage::Supervisor => "For QA Review",
            Stage::Qa => "For Director Approval",
            Stage::Director => "For Releasing",
            Stage::ReleasingOfficer => "Released",
        }
    }

    /// Key used by legacy spreadsheets and listing sort parameters for the
    /// stage's completion date.
    pub fn end_date_key(self) -> &'static str {
        match self {
            Stage::Decker => "date_decked_end",
            Stage::Evaluator => "date_eval_end",
            Stage::Checker => "date_checker_end",
            Stage::Supervisor => "date_supervisor_end",
            Stage::Qa => "date_qa_end",
            Stage::Director => "date_director_end",
            Stage::ReleasingOfficer => "date_releasing_officer_end",
        }
    }

    /// Prefix legacy spreadsheets use for decision and remarks columns.
    pub fn legacy_prefix(self) -> &'static str {
        match self {
            Stage::Evaluator => "eval",
            other => other.column(),
        }
    }

    pub fn predecessor(self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Stage::ALL[i])
    }

    pub fn successor(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    /// Accepts the URL slugs used by the stage routes.
    pub fn from_slug(slug: &str) -> Option<Stage> {
        match slug.trim().to_ascii_lowercase().as_str() {
            "decker" | "deck" | "decking" => Some(Stage::Decker),
            "evaluator" | "evaluation" | "eval" => Some(Stage::Evaluator),
            "checker" | "checking" => Some(Stage::Checker),
            "supervisor" => Some(Stage::Supervisor),
            "qa" => Some(Stage::Qa),
            "director" => Some(Stage::Director),
            "releasing" | "releasing_officer" | "releasing-officer" => Some(Stage::ReleasingOfficer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    #[default]
    Pending,
    Completed,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            StageState::Pending => "pending",
            StageState::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> StageState {
        if raw.eq_ignore_ascii_case("completed") {
            StageState::Completed
        } else {
            StageState::Pending
        }
    }
}

/// Non-empty after trimming and not the "N/A" placeholder.
pub fn is_meaningful_actor(actor: Option<&str>) -> bool {
    actor.map(str::trim).is_some_and(|a| !a.is_empty() && a != "N/A")
}

/// One stage's slice of a delegation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSlot {
    pub actor: Option<String>,
    pub decision: Option<String>,
    pub remarks: Option<String>,
    pub state: StageState,
    pub completed_at: Option<NaiveDateTime>,
}

impl StageSlot {
    pub fn has_actor(&self) -> bool {
        is_meaningful_actor(self.actor.as_deref())
    }

    pub fn is_completed(&self) -> bool {
        self.state == StageState::Completed && self.has_actor()
    }
}

/// Workflow state of one application across all seven stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delegation {
    pub id: i64,
    pub application_id: i64,
    pub dtn: Option<i64>,
    pub date_decked: Option<NaiveDateTime>,
    pub stages: [StageSlot; 7],
}

impl Delegation {
    pub fn stage(&self, stage: Stage) -> &StageSlot {
        &self.stages[stage.index()]
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageSlot {
        &mut self.stages[stage.index()]
    }

    /// Decked means an evaluator has been assigned.
    pub fn is_decked(&self) -> bool {
        self.stage(Stage::Evaluator).has_actor()
    }

    pub fn is_evaluated(&self) -> bool {
        self.stage(Stage::Evaluator).is_completed()
    }

    /// First stage that is not completed, or `None` once released.
    pub fn current_stage(&self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| !self.stage(*s).is_completed())
    }

    pub fn view(&self) -> DelegationView {
        DelegationView {
            id: self.id,
            application_id: self.application_id,
            dtn: self.dtn,
            date_decked: self.date_decked,
            is_decked: self.is_decked(),
            current_stage: self.current_stage(),
            stages: Stage::ALL
                .into_iter()
                .map(|stage| {
                    let slot = self.stage(stage);
                    StageView {
                        stage,
                        label: stage.label(),
                        completed: slot.is_completed(),
                        slot: slot.clone(),
                    }
                })
                .collect(),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Delegation {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut stages: [StageSlot; 7] = Default::default();
        for stage in Stage::ALL {
            let p = stage.column();
            let state: String = row.try_get(format!("{p}_state").as_str())?;
            stages[stage.index()] = StageSlot {
                actor: row.try_get(p)?,
                decision: row.try_get(format!("{p}_decision").as_str())?,
                remarks: row.try_get(format!("{p}_remarks").as_str())?,
                state: StageState::parse(&state),
                completed_at: row.try_get(format!("{p}_end").as_str())?,
            };
        }
        Ok(Delegation {
            id: row.try_get("id")?,
            application_id: row.try_get("application_id")?,
            dtn: row.try_get("dtn")?,
            date_decked: row.try_get("date_decked")?,
            stages,
        })
    }
}

/// Serialized shape of a delegation record.
#[derive(Debug, Clone, Serialize)]
pub struct DelegationView {
    pub id: i64,
    pub application_id: i64,
    pub dtn: Option<i64>,
    pub date_decked: Option<NaiveDateTime>,
    pub is_decked: bool,
    pub current_stage: Option<Stage>,
    pub stages: Vec<StageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub label: &'static str,
    pub completed: bool,
    #[serde(flatten)]
    pub slot: StageSlot,
}

/// Row of the deck listings.
#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    pub id: i64,
    pub dtn: Option<i64>,
    pub decker: Option<String>,
    pub evaluator: Option<String>,
    pub decker_decision: Option<String>,
    pub date_decked: Option<NaiveDateTime>,
    pub date_decked_end: Option<NaiveDateTime>,
}

impl From<&Delegation> for DeckSummary {
    fn from(d: &Delegation) -> Self {
        let decker = d.stage(Stage::Decker);
        DeckSummary {
            id: d.application_id,
            dtn: d.dtn,
            decker: decker.actor.clone(),
            evaluator: d.stage(Stage::Evaluator).actor.clone(),
            decker_decision: decker.decision.clone(),
            date_decked: d.date_decked,
            date_decked_end: decker.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meaningful_actor_rules() {
        assert!(is_meaningful_actor(Some("Dr. Reyes")));
        assert!(!is_meaningful_actor(Some("N/A")));
        assert!(!is_meaningful_actor(Some("  N/A ")));
        assert!(!is_meaningful_actor(Some("   ")));
        assert!(!is_meaningful_actor(None));
    }

    #[test]
    fn stage_order_links() {
        assert_eq!(Stage::Decker.predecessor(), None);
        assert_eq!(Stage::Supervisor.predecessor(), Some(Stage::Checker));
        assert_eq!(Stage::Director.successor(), Some(Stage::ReleasingOfficer));
        assert_eq!(Stage::ReleasingOfficer.successor(), None);
    }

    #[test]
    fn slugs_resolve() {
        assert_eq!(Stage::from_slug("releasing"), Some(Stage::ReleasingOfficer));
        assert_eq!(Stage::from_slug("QA"), Some(Stage::Qa));
        assert_eq!(Stage::from_slug("auditor"), None);
    }

    #[test]
    fn completed_state_needs_a_meaningful_actor() {
        let slot = StageSlot {
            actor: Some("N/A".into()),
            state: StageState::Completed,
            ..Default::default()
        };
        assert!(!slot.is_completed());
    }

    #[test]
    fn current_stage_is_first_incomplete() {
        let mut d = Delegation::default();
        assert_eq!(d.current_stage(), Some(Stage::Decker));
        let decker = d.stage_mut(Stage::Decker);
        decker.actor = Some("Ana".into());
        decker.state = StageState::Completed;
        d.stage_mut(Stage::Evaluator).actor = Some("Ben".into());
        assert_eq!(d.current_stage(), Some(Stage::Evaluator));
        assert!(d.is_decked());
        assert!(!d.is_evaluated());
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_value(StageState::Completed).unwrap(), "completed");
        assert_eq!(serde_json::to_value(Stage::ReleasingOfficer).unwrap(), "releasing_officer");
    }
}
