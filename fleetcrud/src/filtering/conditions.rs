use sea_orm::{
    ColumnTrait, Condition, Value,
    sea_query::{Expr, Func, SimpleExpr},
};
use std::collections::HashMap;
use uuid::Uuid;

use super::FilterOptions;
use super::search::{build_fulltext_condition, build_like_condition};
use crate::core::CRUDResource;

const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Status value that means "do not filter on status".
pub const ALL_STATUSES: &str = "all";

fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty() && field_name.len() <= 100 && !field_name.starts_with('_') && !field_name.contains("..")
}

/// Parse comparison operator suffixes.
/// Returns (`base_field_name`, `sql_operator`) if a suffix is found
fn parse_comparison_operator(field_name: &str) -> Option<(&str, &'static str)> {
    const SUFFIXES: [(&str, &str); 5] = [("_gte", ">="), ("_lte", "<="), ("_neq", "!="), ("_gt", ">"), ("_lt", "<")];
    SUFFIXES
        .iter()
        .find_map(|(suffix, op)| field_name.strip_suffix(suffix).map(|base| (base, *op)))
}

fn compare<C: ColumnTrait, V: Into<Value>>(column: C, operator: &str, value: V) -> SimpleExpr {
    let column = Expr::col(column);
    match operator {
        ">=" => column.gte(value),
        "<=" => column.lte(value),
        ">" => column.gt(value),
        "<" => column.lt(value),
        "!=" => column.ne(value),
        _ => column.eq(value),
    }
}

fn parse_filter_json(filter_str: Option<&str>) -> HashMap<String, serde_json::Value> {
    filter_str.map_or_else(HashMap::new, |filter| match serde_json::from_str(filter) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid JSON in filter parameter");
            HashMap::new()
        }
    })
}

fn is_all_statuses(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(ALL_STATUSES)
}

fn case_insensitive_eq<C: ColumnTrait>(column: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::upper(Expr::col(column))).eq(value.to_uppercase())
}

fn process_string_filter<T: CRUDResource>(key: &str, string_value: &str, column: T::ColumnType) -> Option<SimpleExpr> {
    if string_value.len() > MAX_FIELD_VALUE_LENGTH {
        return None;
    }

    let trimmed_value = string_value.trim();
    if trimmed_value.is_empty() {
        return None;
    }

    if T::status_field() == Some(key) && is_all_statuses(trimmed_value) {
        return None;
    }

    if T::like_filterable_columns().contains(&key) {
        return Some(build_like_condition(column, trimmed_value));
    }

    if T::is_enum_field(key) {
        return Some(case_insensitive_eq(column, trimmed_value));
    }

    if let Ok(uuid_value) = Uuid::parse_str(trimmed_value) {
        return Some(Expr::col(column).eq(uuid_value));
    }

    Some(case_insensitive_eq(column, trimmed_value))
}

fn process_number_filter<C: ColumnTrait>(operator: &str, number: &serde_json::Number, column: C) -> Option<SimpleExpr> {
    if let Some(int_value) = number.as_i64() {
        Some(compare(column, operator, int_value))
    } else {
        number.as_f64().map(|float_value| compare(column, operator, float_value))
    }
}

fn process_array_filter<C: ColumnTrait>(array_values: &[serde_json::Value], column: C) -> Option<SimpleExpr> {
    let values: Vec<Value> = array_values
        .iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => Some(
                Uuid::parse_str(s.trim()).map_or_else(|_| Value::from(s.clone()), Value::from),
            ),
            serde_json::Value::Number(n) => n.as_i64().map(Value::from).or_else(|| n.as_f64().map(Value::from)),
            serde_json::Value::Bool(b) => Some(Value::from(*b)),
            _ => None,
        })
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(Expr::col(column).is_in(values))
    }
}

fn find_column<C: Copy>(columns: &[(&'static str, C)], name: &str) -> Option<C> {
    columns.iter().find(|(col_name, _)| *col_name == name).map(|(_, col)| *col)
}

/// Translate `FilterOptions` into a condition for resource `T`.
///
/// - `q` (parameter or filter key) searches the resource's fulltext columns
/// - `status` applies a case-insensitive match on the status column, unless it is `all`
/// - every other filter key must name a filterable column, or a filterable column with a
///   comparison suffix; unknown keys are ignored
pub fn apply_filters<T: CRUDResource>(params: &FilterOptions) -> Condition {
    let filters = parse_filter_json(params.filter.as_deref());
    let filterable = T::filterable_columns();
    let mut condition = Condition::all();

    let search_term = params
        .q
        .as_deref()
        .or_else(|| filters.get("q").and_then(serde_json::Value::as_str));
    if let Some(term) = search_term
        && let Some(search) = build_fulltext_condition(term, &T::fulltext_searchable_columns())
    {
        condition = condition.add(search);
    }

    if let (Some(status), Some(field)) = (params.status.as_deref(), T::status_field())
        && !status.trim().is_empty()
        && !is_all_statuses(status)
        && let Some(column) = find_column(&filterable, field)
    {
        condition = condition.add(case_insensitive_eq(column, status.trim()));
    }

    for (key, value) in &filters {
        if key == "q" || !is_valid_field_name(key) {
            continue;
        }

        let filter_expr = if let Some(column) = find_column(&filterable, key) {
            match value {
                serde_json::Value::String(string_value) => process_string_filter::<T>(key, string_value, column),
                serde_json::Value::Number(number) => process_number_filter("=", number, column),
                serde_json::Value::Bool(bool_value) => Some(Expr::col(column).eq(*bool_value)),
                serde_json::Value::Array(array_values) => process_array_filter(array_values, column),
                serde_json::Value::Null => Some(Expr::col(column).is_null()),
                serde_json::Value::Object(_) => None,
            }
        } else if let Some((base_field, operator)) = parse_comparison_operator(key)
            && let Some(column) = find_column(&filterable, base_field)
            && let serde_json::Value::Number(number) = value
        {
            process_number_filter(operator, number, column)
        } else {
            None
        };

        if let Some(filter_expr) = filter_expr {
            condition = condition.add(filter_expr);
        }
    }

    condition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison_operator() {
        assert_eq!(parse_comparison_operator("odometer_km_gte"), Some(("odometer_km", ">=")));
        assert_eq!(parse_comparison_operator("odometer_km_lte"), Some(("odometer_km", "<=")));
        assert_eq!(parse_comparison_operator("year_gt"), Some(("year", ">")));
        assert_eq!(parse_comparison_operator("year_lt"), Some(("year", "<")));
        assert_eq!(parse_comparison_operator("year_neq"), Some(("year", "!=")));
        assert_eq!(parse_comparison_operator("year"), None);
    }

    #[test]
    fn test_invalid_field_names() {
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("_private"));
        assert!(!is_valid_field_name("a..b"));
        assert!(!is_valid_field_name(&"x".repeat(101)));
        assert!(is_valid_field_name("registration"));
    }

    #[test]
    fn test_all_statuses_any_case() {
        assert!(is_all_statuses("all"));
        assert!(is_all_statuses("ALL"));
        assert!(is_all_statuses(" All "));
        assert!(!is_all_statuses("active"));
    }

    #[test]
    fn test_invalid_filter_json_is_ignored() {
        assert!(parse_filter_json(Some("{not json")).is_empty());
        assert!(parse_filter_json(None).is_empty());
        assert_eq!(parse_filter_json(Some(r#"{"make":"Volvo"}"#)).len(), 1);
    }
}
