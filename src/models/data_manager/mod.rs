pub mod columns;
pub mod export;
pub mod import;
pub mod types;

pub use export::export_workbook;
pub use import::{import_rows, parse_workbook};
pub use types::*;
