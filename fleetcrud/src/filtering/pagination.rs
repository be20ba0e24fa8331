use axum::http::{HeaderValue, header::HeaderMap};

use super::FilterOptions;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Parse a React Admin `[start, end]` range. Invalid input yields the first page.
#[must_use]
pub fn parse_range(range_str: Option<&str>) -> (u64, u64) {
    let default = (0, DEFAULT_PAGE_SIZE - 1);
    range_str.map_or(default, |r| {
        serde_json::from_str::<[u64; 2]>(r)
            .ok()
            .filter(|[start, end]| end >= start)
            .map_or(default, |[start, end]| (start, end))
    })
}

/// Resolve `(offset, limit)` from either `page`/`per_page` or `range`.
///
/// Defaults to `(0, 10)`; the limit is always within `1..=100`.
#[must_use]
pub fn parse_pagination(params: &FilterOptions) -> (u64, u64) {
    if params.page.is_some() || params.per_page.is_some() {
        let per_page = params
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = params.page.unwrap_or(1).max(1);
        ((page - 1).saturating_mul(per_page), per_page)
    } else if let Some(range) = params.range.as_deref() {
        let (start, end) = parse_range(Some(range));
        let limit = (end - start).saturating_add(1).min(MAX_PAGE_SIZE);
        (start, limit)
    } else {
        (0, DEFAULT_PAGE_SIZE)
    }
}

/// Build the `Content-Range: <resource> <start>-<end>/<total>` header.
///
/// The resource name is stripped of control characters before it reaches the header.
#[must_use]
pub fn calculate_content_range(offset: u64, limit: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let last = offset
        .saturating_add(limit.max(1) - 1)
        .min(total_count.saturating_sub(1));
    let safe_name = sanitize_resource_name(resource_name);

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("{safe_name} {offset}-{last}/{total_count}"))
        .unwrap_or_else(|_| HeaderValue::from_static("items 0-0/0"));
    headers.insert("Content-Range", value);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(headers: &HeaderMap) -> &str {
        headers.get("Content-Range").unwrap().to_str().unwrap()
    }

    #[test]
    fn test_content_range_normal() {
        let headers = calculate_content_range(0, 10, 100, "vehicles");
        assert_eq!(header(&headers), "vehicles 0-9/100");
    }

    #[test]
    fn test_content_range_last_partial_page() {
        let headers = calculate_content_range(20, 10, 25, "jobs");
        assert_eq!(header(&headers), "jobs 20-24/25");
    }

    #[test]
    fn test_content_range_strips_control_characters() {
        let headers = calculate_content_range(0, 10, 100, "vehicles\r\nInjected: evil");
        let value = header(&headers);
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.starts_with("vehiclesInjected: evil"));
    }

    #[test]
    fn test_content_range_zero_items() {
        let headers = calculate_content_range(0, 10, 0, "vehicles");
        assert_eq!(header(&headers), "vehicles 0-0/0");
    }

    #[test]
    fn test_content_range_large_numbers() {
        let headers = calculate_content_range(u64::MAX - 100, 10, u64::MAX, "vehicles");
        assert!(header(&headers).starts_with("vehicles"));
    }

    #[test]
    fn test_parse_pagination_defaults() {
        assert_eq!(parse_pagination(&FilterOptions::default()), (0, 10));
    }

    #[test]
    fn test_parse_pagination_page_and_per_page() {
        let params = FilterOptions {
            page: Some(3),
            per_page: Some(20),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&params), (40, 20));
    }

    #[test]
    fn test_parse_pagination_clamps_per_page() {
        let params = FilterOptions {
            page: Some(1),
            per_page: Some(5_000),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&params), (0, MAX_PAGE_SIZE));

        let zero = FilterOptions {
            page: Some(0),
            per_page: Some(0),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&zero), (0, 1));
    }

    #[test]
    fn test_parse_pagination_range() {
        let params = FilterOptions {
            range: Some("[10,19]".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_pagination(&params), (10, 10));
    }

    #[test]
    fn test_parse_range_invalid_falls_back() {
        assert_eq!(parse_range(Some("nope")), (0, 9));
        assert_eq!(parse_range(Some("[9,0]")), (0, 9));
        assert_eq!(parse_range(None), (0, 9));
    }
}
