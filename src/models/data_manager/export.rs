use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::errors::AppError;
use crate::models::application::{ApplicationDetails, ApplicationListItem};
use crate::models::delegation::Stage;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn header_row() -> Vec<String> {
    let mut headers = vec!["id".to_string(), "dtn".to_string()];
    headers.extend(ApplicationDetails::FIELDS.iter().map(|(name, _, _)| name.to_string()));
    headers.extend(
        ["is_in_pm", "user_uploader", "date_excel_upload", "trash", "date_decked"]
            .into_iter()
            .map(String::from),
    );
    for stage in Stage::ALL {
        let p = stage.column();
        headers.extend([
            p.to_string(),
            format!("{p}_decision"),
            format!("{p}_remarks"),
            format!("{p}_state"),
            format!("{p}_end"),
        ]);
    }
    headers
}

fn write_opt_str(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<(), XlsxError> {
    if let Some(v) = value {
        sheet.write_string(row, col, v)?;
    }
    Ok(())
}

fn write_opt_ts(sheet: &mut Worksheet, row: u32, col: u16, value: Option<NaiveDateTime>) -> Result<(), XlsxError> {
    if let Some(ts) = value {
        sheet.write_string(row, col, ts.format(TIMESTAMP_FORMAT).to_string())?;
    }
    Ok(())
}

fn write_item(sheet: &mut Worksheet, row: u32, item: &ApplicationListItem) -> Result<(), XlsxError> {
    let app = &item.application;
    let mut col: u16 = 0;
    let mut next = || {
        let c = col;
        col += 1;
        c
    };

    sheet.write_number(row, next(), app.id as f64)?;
    let c = next();
    if let Some(dtn) = app.dtn {
        sheet.write_number(row, c, dtn as f64)?;
    }
    for (name, _, _) in ApplicationDetails::FIELDS {
        write_opt_str(sheet, row, next(), app.details.get(name))?;
    }
    let c = next();
    if let Some(flag) = app.is_in_pm {
        sheet.write_number(row, c, f64::from(flag))?;
    }
    write_opt_str(sheet, row, next(), app.user_uploader.as_deref())?;
    write_opt_ts(sheet, row, next(), app.date_excel_upload)?;
    write_opt_str(sheet, row, next(), app.trash.as_deref())?;

    let Some(view) = &item.delegation else {
        return Ok(());
    };
    write_opt_ts(sheet, row, next(), view.date_decked)?;
    for stage in &view.stages {
        let slot = &stage.slot;
        write_opt_str(sheet, row, next(), slot.actor.as_deref())?;
        write_opt_str(sheet, row, next(), slot.decision.as_deref())?;
        write_opt_str(sheet, row, next(), slot.remarks.as_deref())?;
        write_opt_str(sheet, row, next(), Some(slot.state.as_str()))?;
        write_opt_ts(sheet, row, next(), slot.completed_at)?;
    }
    Ok(())
}

fn build(items: &[ApplicationListItem]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Applications")?;
    let bold = Format::new().set_bold();
    for (col, header) in header_row().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    for (i, item) in items.iter().enumerate() {
        write_item(sheet, i as u32 + 1, item)?;
    }
    workbook.save_to_buffer()
}

/// Render listing rows as an `.xlsx` workbook. Headers are column names, so
/// the file can be fed back through the importer.
pub fn export_workbook(items: &[ApplicationListItem]) -> Result<Vec<u8>, AppError> {
    build(items).map_err(|e| AppError::Excel(format!("Could not write workbook: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::Application;
    use crate::models::data_manager::import::parse_workbook;
    use crate::models::delegation::{Delegation, StageState};

    fn item() -> ApplicationListItem {
        let mut details = ApplicationDetails::default();
        details.prod_br_name = Some("Amoxil".into());
        details.fee = Some("1500.00".into());
        let mut delegation = Delegation { id: 1, application_id: 9, dtn: Some(555), ..Default::default() };
        let decker = delegation.stage_mut(Stage::Decker);
        decker.actor = Some("Ana".into());
        decker.decision = Some("For evaluation".into());
        decker.state = StageState::Completed;
        delegation.stage_mut(Stage::Evaluator).actor = Some("Ben".into());
        ApplicationListItem {
            application: Application {
                id: 9,
                dtn: Some(555),
                details,
                is_in_pm: Some(0),
                trash: None,
                trash_date: None,
                user_uploader: Some("admin".into()),
                date_excel_upload: None,
            },
            is_decked: true,
            delegation: Some(delegation.view()),
        }
    }

    #[test]
    fn exported_workbook_reimports() {
        let bytes = export_workbook(&[item()]).unwrap();
        let rows = parse_workbook(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        let row = rows[0].result.as_ref().unwrap();
        assert_eq!(row.application.dtn, Some(555));
        assert_eq!(row.application.details.prod_br_name.as_deref(), Some("Amoxil"));
        assert_eq!(row.application.details.fee.as_deref(), Some("1500.00"));
        assert!(row.delegation.stage(Stage::Decker).is_completed());
        assert_eq!(row.delegation.stage(Stage::Evaluator).actor.as_deref(), Some("Ben"));
    }
}
