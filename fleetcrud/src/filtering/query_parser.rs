use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for filtering, pagination, and sorting resources.
///
/// # Filtering
/// The `filter` parameter accepts a JSON-encoded object:
/// - **Free text search:** `{"q": "search text"}` (same as the `q` parameter)
/// - **Filter by a single ID:** `{"id": "550e8400-e29b-41d4-a716-446655440000"}`
/// - **Filter by multiple IDs:** `{"id": ["550e8400-...", "550e8400-..."]}`
/// - **Numeric comparisons:** `{"odometer_km_gte": 10000}` (`_gte`, `_lte`, `_gt`, `_lt`, `_neq`)
/// - **Null checks:** `{"driver_id": null}`
///
/// The `status` parameter is a shortcut for filtering on the resource's status column.
/// A value of `all` applies no status filter.
///
/// # Pagination
/// - **React Admin format:** `range=[0,9]`
/// - **Standard REST format:** `page=1&per_page=10` (`per_page` is capped at 100)
///
/// # Sorting
/// - `sort=["registration","ASC"]`, or `sort_by=registration&order=ASC`
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct FilterOptions {
    /// JSON-encoded filter object.
    #[param(example = json!({"status": "active", "make": "Volvo"}))]
    pub filter: Option<String>,
    /// Free-text search over the resource's searchable columns.
    #[param(example = "volvo")]
    pub q: Option<String>,
    /// Status shortcut. `all` disables the status filter.
    #[param(example = "active")]
    pub status: Option<String>,
    /// Range for pagination in the format "[start, end]".
    #[param(example = "[0,9]")]
    pub range: Option<String>,
    /// Page number for standard REST pagination (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of items per page for standard REST pagination.
    #[param(example = 10)]
    pub per_page: Option<u64>,
    /// Sort order for the results in the format `["column", "order"]`.
    #[param(example = r#"["created_at", "DESC"]"#)]
    pub sort: Option<String>,
    /// Sort column for standard REST format.
    #[param(example = "created_at")]
    pub sort_by: Option<String>,
    /// Sort order for standard REST format (ASC or DESC).
    #[param(example = "DESC")]
    pub order: Option<String>,
}

impl FilterOptions {
    /// Canonical representation of the query, used as part of a cache key.
    ///
    /// Two requests that differ only in the key order of their `filter` JSON produce
    /// the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let filter = self
            .filter
            .as_deref()
            .map(|raw| {
                serde_json::from_str::<serde_json::Value>(raw)
                    .map_or_else(|_| raw.to_string(), |value| value.to_string())
            })
            .unwrap_or_default();
        let opt = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
        let num = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
        format!(
            "filter={filter}&q={}&status={}&range={}&page={}&per_page={}&sort={}&sort_by={}&order={}",
            opt(&self.q).trim().to_lowercase(),
            opt(&self.status).trim().to_lowercase(),
            opt(&self.range),
            num(self.page),
            num(self.per_page),
            opt(&self.sort),
            opt(&self.sort_by),
            opt(&self.order).to_uppercase(),
        )
    }
}
