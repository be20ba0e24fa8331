//! # Filtering, Search, Sorting and Pagination
//!
//! Translates list query parameters into sea-orm conditions without writing SQL by hand.
//!
//! ```text
//! GET /vehicles?status=active                       status shortcut ("all" disables it)
//! GET /vehicles?q=volvo                             case-insensitive search over fulltext columns
//! GET /vehicles?filter={"make":"Volvo"}             case-insensitive equality
//! GET /vehicles?filter={"odometer_km_gte":50000}    numeric comparison (_gte, _lte, _gt, _lt, _neq)
//! GET /vehicles?filter={"driver_id":null}           IS NULL
//! GET /vehicles?filter={"id":["…","…"]}             IN
//! GET /vehicles?sort=["registration","ASC"]         or sort_by=registration&order=ASC
//! GET /vehicles?page=2&per_page=25                  or range=[25,49]
//! ```
//!
//! Every list response carries `Content-Range: vehicles 25-49/120`.

pub mod conditions;
pub mod pagination;
pub mod query_parser;
pub mod search;
pub mod sort;

pub use conditions::{ALL_STATUSES, apply_filters};
pub use pagination::{MAX_PAGE_SIZE, calculate_content_range, parse_pagination, parse_range};
pub use query_parser::FilterOptions;
pub use search::{build_fulltext_condition, build_like_condition};
pub use sort::parse_sorting;
