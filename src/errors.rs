use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::responses::{ApiErrorResponse, BulkResponse};
use crate::workflow::WorkflowError;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
    Hash(String),
    Session(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    PreconditionFailed(String),
    Validation(String),
    Excel(String),
    /// A bulk action whose transaction could not be committed. Every id is
    /// reported as failed.
    TransactionFailed(BulkResponse),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Migrate(e) => write!(f, "Migration error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthorized(msg) => write!(f, "{msg}"),
            AppError::Forbidden(msg) => write!(f, "{msg}"),
            AppError::NotFound(msg) => write!(f, "{msg}"),
            AppError::PreconditionFailed(msg) => write!(f, "{msg}"),
            AppError::Validation(msg) => write!(f, "{msg}"),
            AppError::Excel(msg) => write!(f, "Excel error: {msg}"),
            AppError::TransactionFailed(report) => write!(f, "{}", report.message),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PreconditionFailed(_) | AppError::Validation(_) | AppError::Excel(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Db(_)
            | AppError::Migrate(_)
            | AppError::Hash(_)
            | AppError::Session(_)
            | AppError::TransactionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::TransactionFailed(report) => {
                log::error!("{}", report.message);
                HttpResponse::build(status).json(report)
            }
            AppError::Db(_) | AppError::Migrate(_) | AppError::Hash(_) | AppError::Session(_) => {
                log::error!("{self}");
                HttpResponse::build(status).json(ApiErrorResponse {
                    error: "Internal server error".to_string(),
                    details: None,
                })
            }
            _ => HttpResponse::build(status).json(ApiErrorResponse {
                error: self.to_string(),
                details: None,
            }),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Migrate(e)
    }
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::NotFound(_) => AppError::NotFound(e.to_string()),
            WorkflowError::NotDecked | WorkflowError::PredecessorIncomplete { .. } => {
                AppError::PreconditionFailed(e.to_string())
            }
            WorkflowError::Validation(msg) => AppError::Validation(msg),
        }
    }
}
