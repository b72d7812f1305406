use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub application_id: i64,
    pub application_step: Option<String>,
    pub user_name: Option<String>,
    pub application_status: Option<String>,
    pub application_decision: Option<String>,
    pub application_remarks: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub accomplished_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A log entry to append. Stage actions build these themselves; clients may
/// post them directly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewLogEntry {
    #[serde(alias = "main_db_id")]
    pub application_id: i64,
    #[serde(default)]
    pub application_step: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub application_status: Option<String>,
    #[serde(default)]
    pub application_decision: Option<String>,
    #[serde(default)]
    pub application_remarks: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub accomplished_date: Option<NaiveDateTime>,
}

/// Search criteria for the log trail. All fields optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSearch {
    pub step: Option<String>,
    pub user: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<NaiveDateTime>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<NaiveDateTime>,
    pub limit: Option<i64>,
}

/// Query string form of [`LogSearch`]. Bounds accept a date or a date-time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSearchQuery {
    pub step: Option<String>,
    pub user: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

impl LogSearchQuery {
    pub fn into_search(self) -> Result<LogSearch, String> {
        let from = match self.from.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_bound(raw, NaiveTime::MIN).ok_or_else(|| format!("Invalid 'from' date: {raw}"))?),
            None => None,
        };
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let to = match self.to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_bound(raw, end_of_day).ok_or_else(|| format!("Invalid 'to' date: {raw}"))?),
            None => None,
        };
        Ok(LogSearch {
            step: self.step.filter(|s| !s.trim().is_empty()),
            user: self.user.filter(|s| !s.trim().is_empty()),
            from,
            to,
            limit: self.limit,
        })
    }
}

fn parse_bound(raw: &str, time_of_day: NaiveTime) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.and_time(time_of_day))
}
