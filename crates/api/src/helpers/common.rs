//! Common helper functions used across API endpoints

use api_types::{ErrorResponse, SectionErrorBody};
use axum::http::StatusCode;
use feed::FeedError;
use thiserror::Error;
use warehouse::{ParamsError, WarehouseError};

use super::normalize::SchemaMismatch;

/// Failure confined to one section of the dashboard
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SectionError {
    /// The warehouse round trip failed
    #[error(transparent)]
    Query(#[from] WarehouseError),
    /// Rows did not match the view schema
    #[error(transparent)]
    Schema(#[from] SchemaMismatch),
    /// The hosted query API failed
    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl SectionError {
    /// Stable kind reported to the client.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Query(_) => "query-execution-failed",
            Self::Schema(_) => "schema-mismatch",
            Self::Feed(_) => "external-feed-unavailable",
        }
    }

    /// Body embedded in the section that failed.
    pub fn body(&self) -> SectionErrorBody {
        SectionErrorBody { kind: self.kind().to_owned(), detail: self.to_string() }
    }

    /// Response for endpoints serving a single section.
    pub fn into_error_response(self) -> ErrorResponse {
        match &self {
            Self::Query(_) | Self::Schema(_) => ErrorResponse::new(
                self.kind(),
                "Internal Server Error",
                StatusCode::INTERNAL_SERVER_ERROR,
                self.to_string(),
            ),
            Self::Feed(_) => ErrorResponse::new(
                self.kind(),
                "Bad Gateway",
                StatusCode::BAD_GATEWAY,
                self.to_string(),
            ),
        }
    }
}

/// Map a filter rejection to a 400 naming the offending control.
pub fn invalid_params(error: &ParamsError) -> ErrorResponse {
    tracing::warn!(control = error.control(), error = %error, "Rejected filter values");
    ErrorResponse::new(
        "invalid-params",
        "Bad Request",
        StatusCode::BAD_REQUEST,
        format!("{}: {}", error.control(), error),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse::MetricView;

    #[test]
    fn invalid_params_names_the_control() {
        let err = ParamsError::InvalidGranularity("hour".to_owned());
        let resp = invalid_params(&err);
        assert_eq!(resp.status, 400);
        assert_eq!(resp.r#type, "invalid-params");
        assert!(resp.detail.starts_with("granularity: "));
    }

    #[test]
    fn feed_failures_are_bad_gateway() {
        let err = SectionError::from(FeedError::Unavailable { query_id: 1, reason: "down".into() });
        assert_eq!(err.kind(), "external-feed-unavailable");
        assert_eq!(err.into_error_response().status, 502);
    }

    #[test]
    fn schema_failures_are_internal() {
        let err = SectionError::from(SchemaMismatch {
            view: MetricView::Kpi,
            column: "number_of_users".into(),
            reason: "is missing".into(),
        });
        let body = err.body();
        assert_eq!(body.kind, "schema-mismatch");
        assert!(body.detail.contains("number_of_users"));
        assert_eq!(err.into_error_response().status, 500);
    }
}
