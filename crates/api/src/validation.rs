//! Validation of dashboard filter query parameters

use api_types::{ErrorResponse, FilterSelection};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use warehouse::QueryParams;

use crate::helpers::invalid_params;

/// Filter controls shared by every warehouse-backed endpoint
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct FilterQuery {
    /// Bucket width: `day`, `week` or `month` (default `month`)
    pub granularity: Option<String>,
    /// First day of the window, `YYYY-MM-DD` (default `2023-01-01`)
    pub start_date: Option<String>,
    /// Last day of the window, `YYYY-MM-DD` (default `2025-08-31`)
    pub end_date: Option<String>,
}

/// Resolve raw filter values into canonical [`QueryParams`]. Empty values
/// count as missing.
pub fn resolve_filters(query: &FilterQuery) -> Result<QueryParams, ErrorResponse> {
    let present: for<'a> fn(&'a Option<String>) -> Option<&'a str> =
        |v| v.as_deref().filter(|s| !s.trim().is_empty());
    QueryParams::resolve(
        present(&query.granularity),
        present(&query.start_date),
        present(&query.end_date),
    )
    .map_err(|e| invalid_params(&e))
}

/// Selection echoed back in responses.
pub fn filter_selection(params: &QueryParams) -> FilterSelection {
    FilterSelection {
        granularity: params.granularity().to_string(),
        start_date: params.start_date().to_string(),
        end_date: params.end_date().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse::Granularity;

    fn query(granularity: Option<&str>, start: Option<&str>, end: Option<&str>) -> FilterQuery {
        FilterQuery {
            granularity: granularity.map(str::to_owned),
            start_date: start.map(str::to_owned),
            end_date: end.map(str::to_owned),
        }
    }

    #[test]
    fn missing_values_use_defaults() {
        let params = resolve_filters(&FilterQuery::default()).unwrap();
        assert_eq!(params, QueryParams::default());
        let sel = filter_selection(&params);
        assert_eq!(sel.granularity, "month");
        assert_eq!(sel.start_date, "2023-01-01");
        assert_eq!(sel.end_date, "2025-08-31");
    }

    #[test]
    fn blank_values_use_defaults() {
        let params = resolve_filters(&query(Some(""), Some(" "), None)).unwrap();
        assert_eq!(params, QueryParams::default());
    }

    #[test]
    fn granularity_is_case_insensitive() {
        let params = resolve_filters(&query(Some(" WEEK "), None, None)).unwrap();
        assert_eq!(params.granularity(), Granularity::Week);
    }

    #[test]
    fn bad_values_name_their_control() {
        let err = resolve_filters(&query(Some("hour"), None, None)).unwrap_err();
        assert!(err.detail.starts_with("granularity"));

        let err = resolve_filters(&query(None, None, Some("31/08/2025"))).unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.detail.starts_with("end_date"));

        let err =
            resolve_filters(&query(None, Some("2025-02-01"), Some("2025-01-01"))).unwrap_err();
        assert!(err.detail.starts_with("start_date"));
        assert_eq!(err.r#type, "invalid-params");
    }
}
