//! Stage transition rules for the registration workflow.
//!
//! The engine operates on loaded [`Delegation`](crate::models::delegation::Delegation)
//! records and reports what changed; handlers own loading, persistence and the
//! surrounding transaction.

pub mod bulk;
pub mod engine;
pub mod requests;

use std::fmt;

use crate::models::delegation::Stage;

pub use bulk::{BulkDetail, BulkReport, DetailStatus, MAX_BULK_IDS, apply_bulk, validate_record_ids};
pub use engine::{StageOutcome, WorkflowEngine, parse_stage_date};
pub use requests::*;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// No delegation record for this application id.
    NotFound(i64),
    NotDecked,
    PredecessorIncomplete { stage: Stage, predecessor: Stage },
    Validation(String),
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::NotFound(id) => write!(f, "Application record with id {id} not found"),
            WorkflowError::NotDecked => write!(f, "Application is not yet decked"),
            WorkflowError::PredecessorIncomplete { stage, predecessor } => write!(
                f,
                "{} stage cannot be completed before the {} stage",
                stage.label(),
                predecessor.label()
            ),
            WorkflowError::Validation(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for WorkflowError {}
