use serde::Serialize;

use crate::models::delegation::Stage;
use crate::workflow::{BulkDetail, BulkReport};

/// Error body returned by every JSON endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Paginated listing envelope.
#[derive(Serialize, Debug, Clone)]
pub struct PaginatedResponse<T: Serialize> {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub data: Vec<T>,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 { (total + page_size - 1) / page_size } else { 0 };
        PaginatedResponse { total, page, page_size, total_pages, data }
    }
}

/// Result of a single-record workflow action.
#[derive(Serialize, Debug, Clone)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
}

/// Result of a bulk workflow action.
#[derive(Serialize, Debug, Clone)]
pub struct BulkResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
    pub failed_count: usize,
    pub details: Vec<BulkDetail>,
}

impl BulkResponse {
    pub fn from_report(stage: Stage, report: &BulkReport) -> Self {
        BulkResponse {
            success: report.updated_count() > 0,
            message: report.message(stage),
            updated_count: report.updated_count(),
            failed_count: report.failed_count(),
            details: report.details.clone(),
        }
    }

    /// Every id failed because the surrounding transaction did.
    pub fn transaction_failed(ids: &[i64], cause: &str) -> Self {
        BulkResponse {
            success: false,
            message: format!("Transaction failed: {cause}"),
            updated_count: 0,
            failed_count: ids.len(),
            details: ids
                .iter()
                .map(|id| BulkDetail::failed(*id, None, "Transaction failed"))
                .collect(),
        }
    }
}
