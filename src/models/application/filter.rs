// src/models/application/filter.rs
use std::collections::HashMap;

use serde::Deserialize;

use crate::models::delegation::{DECKED_SQL, NOT_DECKED_SQL, Stage};
use crate::models::table_filter::builder::{self, FieldSpec, FieldType};
use crate::models::table_filter::{FilterTree, SortSpec};

pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Columns searched by the free-text `search` parameter.
const SEARCH_COLUMNS: &[&str] = &[
    "a.dtn::TEXT",
    "a.est_lto_comp",
    "a.prod_br_name",
    "a.prod_gen_name",
    "a.reg_no",
    "a.est_cat",
];

/// SQL column expressions for each filter-tree field.
pub fn field_map() -> HashMap<&'static str, FieldSpec> {
    let text = |expr: &'static str| FieldSpec { expr, kind: FieldType::Text };
    let date = |expr: &'static str| FieldSpec { expr, kind: FieldType::Date };
    let mut m = HashMap::new();
    m.insert("dtn",           text("a.dtn::TEXT"));
    m.insert("category",      text("a.est_cat"));
    m.insert("company",       text("a.est_lto_comp"));
    m.insert("brand_name",    text("a.prod_br_name"));
    m.insert("generic_name",  text("a.prod_gen_name"));
    m.insert("dosage_form",   text("a.prod_dos_form"));
    m.insert("reg_no",        text("a.reg_no"));
    m.insert("app_type",      text("a.app_type"));
    m.insert("app_status",    text("a.app_status"));
    m.insert("prod_cat",      text("a.prod_cat"));
    m.insert("uploader",      text("a.user_uploader"));
    m.insert("decker",        text("d.decker"));
    m.insert("evaluator",     text("d.evaluator"));
    m.insert("checker",       text("d.checker"));
    m.insert("supervisor",    text("d.supervisor"));
    m.insert("qa",            text("d.qa"));
    m.insert("director",      text("d.director"));
    m.insert("releasing_officer", text("d.releasing_officer"));
    m.insert("date_excel_upload", date("a.date_excel_upload"));
    m.insert("date_decked",   date("d.date_decked"));
    m.insert("date_decked_end",            date("d.decker_end"));
    m.insert("date_eval_end",              date("d.evaluator_end"));
    m.insert("date_checker_end",           date("d.checker_end"));
    m.insert("date_supervisor_end",        date("d.supervisor_end"));
    m.insert("date_qa_end",                date("d.qa_end"));
    m.insert("date_director_end",          date("d.director_end"));
    m.insert("date_releasing_officer_end", date("d.releasing_officer_end"));
    m
}

/// Allowed operators for the applications table.
pub const OPS: &[&str] = &[
    "contains", "not_contains", "equals", "not_equals",
    "starts_with", "is", "is_not", "before", "after", "on",
];

/// Allowed sort keys and their SQL expressions. Accepts legacy `DB_` prefixed
/// and upper-case spellings.
pub fn sort_col(key: &str) -> Option<&'static str> {
    let key = key.trim().to_ascii_lowercase();
    let key = key.strip_prefix("db_").unwrap_or(&key);
    let col = match key {
        "id"                 => "a.id",
        "dtn"                => "a.dtn",
        "est_cat"            => "a.est_cat",
        "est_lto_comp"       => "a.est_lto_comp",
        "prod_br_name"       => "a.prod_br_name",
        "prod_gen_name"      => "a.prod_gen_name",
        "reg_no"             => "a.reg_no",
        "app_type"           => "a.app_type",
        "app_status"         => "a.app_status",
        "prod_cat"           => "a.prod_cat",
        "date_received_fdac" => "a.date_received_fdac",
        "date_received_cent" => "a.date_received_cent",
        "date_excel_upload"  => "a.date_excel_upload",
        "user_uploader"      => "a.user_uploader",
        "date_decked"        => "d.date_decked",
        "decker"             => "d.decker",
        "evaluator"          => "d.evaluator",
        other => return stage_end_col(other),
    };
    Some(col)
}

/// Completion-date column of a stage, by its legacy or canonical key.
fn stage_end_col(key: &str) -> Option<&'static str> {
    Stage::ALL.into_iter().find_map(|stage| {
        let canonical = format!("{}_end", stage.column());
        (key == stage.end_date_key() || key == canonical).then(|| match stage {
            Stage::Decker => "d.decker_end",
            Stage::Evaluator => "d.evaluator_end",
            Stage::Checker => "d.checker_end",
            Stage::Supervisor => "d.supervisor_end",
            Stage::Qa => "d.qa_end",
            Stage::Director => "d.director_end",
            Stage::ReleasingOfficer => "d.releasing_officer_end",
        })
    })
}

/// Raw listing query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    /// JSON-encoded [`FilterTree`].
    pub filter: Option<String>,
    pub trash: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusFilter {
    Decked,
    NotDecked,
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrashScope {
    #[default]
    Active,
    Trashed,
    All,
}

/// Validated listing criteria.
#[derive(Debug, Clone, Default)]
pub struct ListCriteria {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub category: Option<String>,
    pub filter: FilterTree,
    pub trash: TrashScope,
    pub sort: SortSpec,
}

impl ListCriteria {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

impl ListQuery {
    pub fn into_criteria(self) -> Result<ListCriteria, String> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err("page must be at least 1".to_string());
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(format!("page_size must be between 1 and {MAX_PAGE_SIZE}"));
        }
        let sort = SortSpec::parse(self.sort_by.as_deref(), self.sort_order.as_deref())?;
        let status = non_blank(&self.status).map(|s| match s.to_ascii_lowercase().as_str() {
            "decked" => StatusFilter::Decked,
            "not_decked" => StatusFilter::NotDecked,
            _ => StatusFilter::Label(s),
        });
        let trash = match non_blank(&self.trash).as_deref() {
            None | Some("active") => TrashScope::Active,
            Some("trashed") => TrashScope::Trashed,
            Some("all") => TrashScope::All,
            Some(other) => return Err(format!("Unknown trash scope '{other}'")),
        };
        let filter = match non_blank(&self.filter) {
            Some(json) => FilterTree::parse(&json)?,
            None => FilterTree::default(),
        };
        Ok(ListCriteria {
            page,
            page_size,
            search: non_blank(&self.search),
            status,
            category: non_blank(&self.category),
            filter,
            trash,
            sort,
        })
    }
}

/// WHERE fragment over `applications a LEFT JOIN application_delegation d`,
/// with its positional text parameters.
pub fn build_where(criteria: &ListCriteria) -> Result<(String, Vec<String>), builder::BuildError> {
    let mut parts: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    match criteria.trash {
        TrashScope::Active => parts.push("a.trash IS NULL".to_string()),
        TrashScope::Trashed => parts.push("a.trash IS NOT NULL".to_string()),
        TrashScope::All => {}
    }

    if let Some(term) = &criteria.search {
        params.push(format!("%{term}%"));
        let n = params.len();
        let ors: Vec<String> = SEARCH_COLUMNS.iter().map(|c| format!("{c} ILIKE ${n}")).collect();
        parts.push(format!("({})", ors.join(" OR ")));
    }

    match &criteria.status {
        Some(StatusFilter::Decked) => parts.push(DECKED_SQL.to_string()),
        Some(StatusFilter::NotDecked) => parts.push(NOT_DECKED_SQL.to_string()),
        Some(StatusFilter::Label(label)) => {
            params.push(label.clone());
            parts.push(format!("a.app_status = ${}", params.len()));
        }
        None => {}
    }

    if let Some(category) = &criteria.category {
        params.push(category.clone());
        parts.push(format!("a.est_cat = ${}", params.len()));
    }

    if !criteria.filter.is_empty() {
        let (sql, mut p) = builder::build_where_clause(&criteria.filter, &field_map(), OPS, params.len())?;
        params.append(&mut p);
        parts.push(format!("({sql})"));
    }

    if parts.is_empty() {
        return Ok(("1=1".to_string(), params));
    }
    Ok((parts.join(" AND "), params))
}

/// ORDER BY body. Nulls always sort last; ties break on id in the same direction.
pub fn order_clause(sort: &SortSpec) -> String {
    let dir = sort.dir.sql();
    match sort.column.as_deref().and_then(sort_col) {
        Some("a.id") => format!("a.id {dir}"),
        Some(col) => format!("{col} {dir} NULLS LAST, a.id {dir}"),
        None => "a.date_excel_upload DESC NULLS LAST, a.id DESC".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table_filter::SortDir;

    fn criteria(query: ListQuery) -> ListCriteria {
        query.into_criteria().unwrap()
    }

    #[test]
    fn defaults_are_first_page_active_records() {
        let c = criteria(ListQuery::default());
        assert_eq!((c.page, c.page_size), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(c.trash, TrashScope::Active);
        let (sql, params) = build_where(&c).unwrap();
        assert_eq!(sql, "a.trash IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn page_size_is_bounded() {
        let err = ListQuery { page_size: Some(101), ..Default::default() }.into_criteria();
        assert!(err.is_err());
        let err = ListQuery { page_size: Some(0), ..Default::default() }.into_criteria();
        assert!(err.is_err());
    }

    #[test]
    fn status_keywords_map_to_workflow_predicates() {
        let decked = criteria(ListQuery { status: Some("decked".into()), ..Default::default() });
        assert_eq!(decked.status, Some(StatusFilter::Decked));
        let (sql, _) = build_where(&decked).unwrap();
        assert!(sql.contains(DECKED_SQL));

        let label = criteria(ListQuery { status: Some("For Checking".into()), ..Default::default() });
        let (sql, params) = build_where(&label).unwrap();
        assert!(sql.ends_with("a.app_status = $1"));
        assert_eq!(params, vec!["For Checking"]);
    }

    #[test]
    fn search_reuses_one_parameter_and_filter_tree_continues_numbering() {
        let c = criteria(ListQuery {
            search: Some("amox".into()),
            category: Some("Drug".into()),
            filter: Some(r#"{"conditions":[{"field":"evaluator","op":"is","value":"Ben"}]}"#.into()),
            trash: Some("all".into()),
            ..Default::default()
        });
        let (sql, params) = build_where(&c).unwrap();
        assert!(sql.starts_with("(a.dtn::TEXT ILIKE $1 OR "));
        assert!(sql.contains("a.est_cat = $2"));
        assert!(sql.ends_with("(d.evaluator = $3)"));
        assert_eq!(params, vec!["%amox%", "Drug", "Ben"]);
    }

    #[test]
    fn bad_filter_json_is_rejected() {
        let err = ListQuery { filter: Some("{not json".into()), ..Default::default() }.into_criteria();
        assert!(err.unwrap_err().starts_with("Invalid filter"));
    }

    #[test]
    fn sort_keys_accept_legacy_spellings() {
        assert_eq!(sort_col("DB_DTN"), Some("a.dtn"));
        assert_eq!(sort_col("date_eval_end"), Some("d.evaluator_end"));
        assert_eq!(sort_col("checker_end"), Some("d.checker_end"));
        assert_eq!(sort_col("password_hash"), None);
    }

    #[test]
    fn order_clause_puts_nulls_last_both_ways() {
        let desc = SortSpec { column: Some("date_decked_end".into()), dir: SortDir::Desc };
        assert_eq!(order_clause(&desc), "d.decker_end DESC NULLS LAST, a.id DESC");
        let asc = SortSpec { column: Some("dtn".into()), dir: SortDir::Asc };
        assert_eq!(order_clause(&asc), "a.dtn ASC NULLS LAST, a.id ASC");
        let unknown = SortSpec { column: Some("nope".into()), dir: SortDir::Asc };
        assert_eq!(order_clause(&unknown), "a.date_excel_upload DESC NULLS LAST, a.id DESC");
    }
}
