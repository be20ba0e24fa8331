use sea_orm::{ColumnTrait, sea_query::Order};

use super::FilterOptions;

const DEFAULT_SORT_COLUMN: &str = "id";
const DEFAULT_SORT_ORDER: &str = "ASC";

/// Parse sort column and order from JSON array format
fn parse_json_sort(json: &str) -> (String, String) {
    let sort_vec: Vec<String> = serde_json::from_str(json).unwrap_or_default();
    (
        sort_vec
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_SORT_COLUMN.to_string()),
        sort_vec
            .get(1)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SORT_ORDER.to_string()),
    )
}

/// Anything other than `ASC` sorts descending.
fn parse_order(sort_order: &str) -> Order {
    if sort_order.eq_ignore_ascii_case("ASC") {
        Order::Asc
    } else {
        Order::Desc
    }
}

/// Find column by name or return default
fn find_column<C>(column_name: &str, columns: &[(&str, C)], default: C) -> C
where
    C: ColumnTrait + Copy,
{
    columns
        .iter()
        .find(|&&(col_name, _)| col_name == column_name)
        .map_or(default, |&(_, col)| col)
}

/// Parse sorting from `FilterOptions`, supporting both React Admin and standard REST formats.
///
/// `sort_by` wins over `sort`. An unknown column falls back to `default_column`.
pub fn parse_sorting<C>(params: &FilterOptions, order_column_logic: &[(&str, C)], default_column: C) -> (C, Order)
where
    C: ColumnTrait + Copy,
{
    let order_or_default = || params.order.as_deref().unwrap_or(DEFAULT_SORT_ORDER).to_string();
    let (sort_column, sort_order) = if let Some(sort_by) = &params.sort_by {
        (sort_by.clone(), order_or_default())
    } else if let Some(sort) = &params.sort {
        if sort.starts_with('[') {
            parse_json_sort(sort)
        } else {
            (sort.clone(), order_or_default())
        }
    } else {
        (DEFAULT_SORT_COLUMN.to_string(), order_or_default())
    };

    let order_direction = parse_order(&sort_order);
    let order_column = find_column(&sort_column, order_column_logic, default_column);

    (order_column, order_direction)
}
