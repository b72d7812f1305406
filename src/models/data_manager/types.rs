use serde::Serialize;

use crate::models::application::ApplicationInput;
use crate::models::delegation::Delegation;

/// Number of row errors echoed back to the caller.
pub const MAX_REPORTED_ERRORS: usize = 10;

// ── Import types ──────────────────────────────────────────────────

/// One spreadsheet row, ready to insert. `delegation.application_id` is
/// filled in once the application row exists.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub application: ApplicationInput,
    pub delegation: Delegation,
}

/// A data row with its spreadsheet row number (header is row 1).
#[derive(Debug)]
pub struct ParsedRow {
    pub row_number: usize,
    pub result: Result<ImportRow, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub total_rows: usize,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportOutcome {
    pub(crate) fn new(total_rows: usize) -> Self {
        ImportOutcome { success: false, total_rows, imported: 0, failed: 0, errors: Vec::new() }
    }

    pub(crate) fn record_failure(&mut self, row: usize, error: impl Into<String>) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(ImportRowError { row, error: error.into() });
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.success = self.imported > 0 || self.failed == 0;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportRowError {
    pub row: usize,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_errors_are_kept() {
        let mut outcome = ImportOutcome::new(15);
        for row in 2..17 {
            outcome.record_failure(row, "bad");
        }
        let outcome = outcome.finish();
        assert_eq!(outcome.failed, 15);
        assert_eq!(outcome.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(outcome.errors[0].row, 2);
        assert!(!outcome.success);
    }
}
