//! Spreadsheet header matching and per-field cell coercion.

use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::application::{ApplicationDetails, FieldKind};
use crate::models::delegation::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageField {
    Actor,
    Decision,
    Remarks,
    End,
}

/// Where a spreadsheet column lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Dtn,
    IsInPm,
    Detail(&'static str, FieldKind),
    DateDecked,
    Stage(Stage, StageField),
}

/// Match a header cell by column name (with or without a `DB_` prefix) or
/// by label, ignoring case.
pub fn resolve_header(raw: &str) -> Option<Target> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let key = lowered.strip_prefix("db_").unwrap_or(&lowered);

    match key {
        "dtn" => return Some(Target::Dtn),
        "is_in_pm" => return Some(Target::IsInPm),
        "date_decked" => return Some(Target::DateDecked),
        _ => {}
    }
    if let Some((name, _, kind)) = ApplicationDetails::FIELDS.iter().find(|(name, _, _)| *name == key) {
        return Some(Target::Detail(*name, *kind));
    }
    if let Some(target) = resolve_stage_header(key) {
        return Some(target);
    }
    ApplicationDetails::FIELDS
        .iter()
        .find(|(_, label, _)| label.eq_ignore_ascii_case(&lowered))
        .map(|(name, _, kind)| Target::Detail(*name, *kind))
}

fn resolve_stage_header(key: &str) -> Option<Target> {
    for stage in Stage::ALL {
        let col = stage.column();
        let legacy = stage.legacy_prefix();
        let field = if key == col || key == stage.label().to_ascii_lowercase() {
            Some(StageField::Actor)
        } else if key == format!("{col}_decision") || key == format!("{legacy}_decision") {
            Some(StageField::Decision)
        } else if key == format!("{col}_remarks") || key == format!("{legacy}_remarks") {
            Some(StageField::Remarks)
        } else if key == format!("{col}_end") || key == stage.end_date_key() {
            Some(StageField::End)
        } else {
            None
        };
        if let Some(field) = field {
            return Some(Target::Stage(stage, field));
        }
    }
    None
}

/// Plain text; integral floats lose their trailing `.0`.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == NaiveTime::MIN => ts.format("%Y-%m-%d").to_string(),
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => return None,
        },
    };
    (!text.is_empty()).then_some(text)
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Money with two decimals. Text that is not a number is kept verbatim.
pub fn cell_currency(cell: &Data) -> Option<String> {
    match cell {
        Data::Int(i) => Some(format!("{:.2}", *i as f64)),
        Data::Float(f) => Some(format!("{f:.2}")),
        other => {
            let text = cell_text(other)?;
            let cleaned: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
            match cleaned.parse::<f64>() {
                Ok(v) => Some(format!("{v:.2}")),
                Err(_) => Some(text),
            }
        }
    }
}

/// Whole number. A value with a fractional part or non-numeric text is an error.
pub fn cell_integer(cell: &Data, field: &str) -> Result<Option<i64>, String> {
    let not_whole = |shown: String| format!("{field}: '{shown}' is not a whole number");
    match cell {
        Data::Int(i) => Ok(Some(*i)),
        Data::Float(f) if f.fract() == 0.0 => Ok(Some(*f as i64)),
        Data::Float(f) => Err(not_whole(f.to_string())),
        other => match cell_text(other) {
            None => Ok(None),
            Some(text) => {
                if let Ok(i) = text.parse::<i64>() {
                    return Ok(Some(i));
                }
                match text.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(not_whole(text)),
                }
            }
        },
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y", "%B %d, %Y", "%b %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Convert an Excel serial number (days since 1899-12-30) to a timestamp.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Descriptive date field: `YYYY-MM-DD` when recognizable, the original
/// text otherwise.
pub fn cell_date_text(cell: &Data) -> Option<String> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|ts| ts.format("%Y-%m-%d").to_string()),
        Data::Float(f) => from_excel_serial(*f).map(|ts| ts.format("%Y-%m-%d").to_string()),
        Data::Int(i) => from_excel_serial(*i as f64).map(|ts| ts.format("%Y-%m-%d").to_string()),
        other => {
            let text = cell_text(other)?;
            Some(match parse_timestamp_text(&text) {
                Some(ts) => ts.format("%Y-%m-%d").to_string(),
                None => text,
            })
        }
    }
}

/// Delegation timestamp column. Unreadable values become `None`.
pub fn cell_timestamp(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::Float(f) => from_excel_serial(*f),
        Data::Int(i) => from_excel_serial(*i as f64),
        other => {
            let text = cell_text(other)?;
            let parsed = parse_timestamp_text(&text);
            if parsed.is_none() {
                log::warn!("Ignoring unreadable delegation date {text:?}");
            }
            parsed
        }
    }
}

/// Coerce a descriptive cell according to its declared kind.
pub fn coerce_detail(cell: &Data, kind: FieldKind) -> Option<String> {
    match kind {
        FieldKind::Text => cell_text(cell),
        FieldKind::Currency => cell_currency(cell),
        FieldKind::Date => cell_date_text(cell),
    }
}
