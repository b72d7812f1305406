// src/models/table_filter/builder.rs

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use super::{Condition, FilterTree, Group};

/// How a filterable column compares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Text,
    /// Timestamp column; accepts `before`, `after` and `on`.
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Pre-validated SQL expression, never user input.
    pub expr: &'static str,
    pub kind: FieldType,
}

#[derive(Debug, PartialEq)]
pub enum BuildError {
    UnknownField(String),
    UnknownOp(String),
    OpNotAllowed { field: String, op: String },
    InvalidDate { field: String, value: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownField(field) => write!(f, "Unknown filter field '{field}'"),
            BuildError::UnknownOp(op) => write!(f, "Unknown filter operator '{op}'"),
            BuildError::OpNotAllowed { field, op } => {
                write!(f, "Operator '{op}' cannot be applied to field '{field}'")
            }
            BuildError::InvalidDate { field, value } => {
                write!(f, "Filter value '{value}' for field '{field}' is not a date")
            }
        }
    }
}

/// SQL for `op` applied to `col` with the value bound at `$n`, and the field
/// type the operator requires.
fn op_sql(op: &str, col: &str, n: usize) -> Option<(String, FieldType)> {
    use FieldType::{Date, Text};
    Some(match op {
        "contains" => (format!("{col} ILIKE '%' || ${n} || '%'"), Text),
        "not_contains" => (format!("COALESCE({col}, '') NOT ILIKE '%' || ${n} || '%'"), Text),
        "starts_with" => (format!("{col} ILIKE ${n} || '%'"), Text),
        "equals" | "is" => (format!("{col} = ${n}"), Text),
        "not_equals" | "is_not" => (format!("{col} IS DISTINCT FROM ${n}"), Text),
        "before" => (format!("{col} < (${n})::TIMESTAMP"), Date),
        "after" => (format!("{col} > (${n})::TIMESTAMP"), Date),
        "on" => (format!("{col}::DATE = (${n})::DATE"), Date),
        _ => return None,
    })
}

/// Canonical timestamp text for a date filter value, or `None` when the value
/// is not a `YYYY-MM-DD` date or date-time.
fn date_param(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let ts = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
                .into_iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })?;
    Some(ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Accumulates bound values while conditions are rendered, so placeholders
/// keep counting from wherever the caller's own parameters stopped.
struct Clause<'a> {
    fields: &'a HashMap<&'static str, FieldSpec>,
    ops: &'a [&'a str],
    offset: usize,
    params: Vec<String>,
}

impl Clause<'_> {
    fn condition(&mut self, cond: &Condition) -> Result<String, BuildError> {
        let field = self
            .fields
            .get(cond.field.as_str())
            .ok_or_else(|| BuildError::UnknownField(cond.field.clone()))?;
        let n = self.offset + self.params.len() + 1;
        let (sql, wants) = self
            .ops
            .contains(&cond.op.as_str())
            .then(|| op_sql(&cond.op, field.expr, n))
            .flatten()
            .ok_or_else(|| BuildError::UnknownOp(cond.op.clone()))?;
        if wants != field.kind {
            return Err(BuildError::OpNotAllowed { field: cond.field.clone(), op: cond.op.clone() });
        }
        let value = match field.kind {
            FieldType::Text => cond.value.clone(),
            FieldType::Date => date_param(&cond.value).ok_or_else(|| BuildError::InvalidDate {
                field: cond.field.clone(),
                value: cond.value.clone(),
            })?,
        };
        self.params.push(value);
        Ok(sql)
    }

    fn group(&mut self, group: &Group) -> Result<Option<String>, BuildError> {
        let parts = group
            .conditions
            .iter()
            .map(|c| self.condition(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((!parts.is_empty()).then(|| parts.join(group.logic.joiner())))
    }
}

/// Render `tree` as a parameterized WHERE fragment. Placeholders start at
/// `$param_offset + 1`; an empty tree renders as `1=1`.
pub fn build_where_clause(
    tree: &FilterTree,
    field_map: &HashMap<&'static str, FieldSpec>,
    op_whitelist: &[&str],
    param_offset: usize,
) -> Result<(String, Vec<String>), BuildError> {
    let mut clause = Clause { fields: field_map, ops: op_whitelist, offset: param_offset, params: Vec::new() };

    let mut parts = tree
        .root
        .conditions
        .iter()
        .map(|c| clause.condition(c))
        .collect::<Result<Vec<_>, _>>()?;
    for group in &tree.groups {
        if let Some(sql) = clause.group(group)? {
            parts.push(format!("({sql})"));
        }
    }

    if parts.is_empty() {
        return Ok(("1=1".to_string(), Vec::new()));
    }
    Ok((parts.join(tree.root.logic.joiner()), clause.params))
}
