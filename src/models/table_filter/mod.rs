//! JSON filter trees and sort parameters accepted by listing endpoints.

use std::str::FromStr;

use serde::Deserialize;

pub mod builder;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn joiner(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// A single `field op value` test. Values always bind as text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: String,
    pub value: String,
}

/// Conditions joined by one connective.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Group {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// The `filter` query parameter, e.g.
/// `{"logic":"and","conditions":[..],"groups":[{"logic":"or","conditions":[..]}]}`.
/// Root conditions and each nested group are joined with the root logic.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct FilterTree {
    #[serde(flatten)]
    pub root: Group,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl FilterTree {
    pub fn is_empty(&self) -> bool {
        self.root.conditions.is_empty() && self.groups.iter().all(|g| g.conditions.is_empty())
    }

    pub fn parse(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid filter: {e}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            _ => Err("sort_order must be 'asc' or 'desc'".to_string()),
        }
    }
}

/// Requested ordering. The column is a whitelist key, resolved by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    pub column: Option<String>,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Result<Self, String> {
        let dir = match sort_order.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => SortDir::default(),
        };
        let column = sort_by.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Ok(SortSpec { column, dir })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_conditions_and_groups_parse() {
        let tree = FilterTree::parse(
            r#"{
                "logic": "or",
                "conditions": [{"field": "generic_name", "op": "contains", "value": "cillin"}],
                "groups": [{"conditions": [
                    {"field": "app_status", "op": "is", "value": "Pending"},
                    {"field": "category", "op": "is", "value": "Drug"}
                ]}]
            }"#,
        )
        .unwrap();
        assert_eq!(tree.root.logic, Logic::Or);
        assert_eq!(tree.root.conditions[0].value, "cillin");
        assert_eq!(tree.groups[0].logic, Logic::And);
        assert_eq!(tree.groups[0].conditions.len(), 2);
    }

    #[test]
    fn blank_trees_are_empty() {
        assert!(FilterTree::parse("{}").unwrap().is_empty());
        assert!(FilterTree::parse(r#"{"groups": [{"logic": "or"}]}"#).unwrap().is_empty());
        assert!(FilterTree::parse("[1, 2]").unwrap_err().starts_with("Invalid filter"));
    }

    #[test]
    fn sort_order_is_case_insensitive_and_checked() {
        let spec = SortSpec::parse(Some(" dtn "), Some("DESC")).unwrap();
        assert_eq!(spec.column.as_deref(), Some("dtn"));
        assert_eq!(spec.dir.sql(), "DESC");
        assert_eq!(SortSpec::parse(None, Some("")).unwrap(), SortSpec::default());
        assert!(SortSpec::parse(Some("dtn"), Some("sideways")).is_err());
    }
}
