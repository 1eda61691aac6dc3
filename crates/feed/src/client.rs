//! HTTP access to saved query results

use std::time::Instant;

use derive_more::Debug;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// One row of a saved query result
pub type FeedRow = Map<String, Value>;

/// The hosted API could not deliver a usable result
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Transport failure, non-2xx status or an unexpected body
    #[error("external feed unavailable (query {query_id}): {reason}")]
    Unavailable {
        /// Saved query that failed
        query_id: u64,
        /// What went wrong
        reason: String,
    },
}

impl FeedError {
    pub(crate) fn unavailable(query_id: u64, reason: impl Into<String>) -> Self {
        Self::Unavailable { query_id, reason: reason.into() }
    }
}

/// Rows of a saved query plus the column order the API reported
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedResult {
    /// Column names in display order
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<FeedRow>,
}

#[derive(Deserialize)]
struct QueryResults {
    result: ResultBody,
}

#[derive(Deserialize)]
struct ResultBody {
    rows: Vec<FeedRow>,
    #[serde(default)]
    metadata: Option<ResultMetadata>,
}

#[derive(Deserialize)]
struct ResultMetadata {
    #[serde(default)]
    column_names: Vec<String>,
}

/// Client for the hosted query API.
#[derive(Clone, Debug)]
pub struct FeedClient {
    #[debug(skip)]
    http: HttpClient,
    #[debug(skip)]
    api_key: String,
    base_url: Url,
}

impl FeedClient {
    /// Create a client for a custom endpoint.
    pub fn with_base_url(api_key: String, base_url: Url) -> Self {
        Self { http: HttpClient::new(), api_key, base_url }
    }

    /// Endpoint this client talks to.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn results_url(&self, query_id: u64) -> String {
        format!("{}/query/{query_id}/results", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Fetch the latest result rows of saved query `query_id`.
    pub async fn query_results(&self, query_id: u64) -> Result<FeedResult, FeedError> {
        let start = Instant::now();
        let result = self.request(query_id).await;
        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(res) => debug!(query_id, duration_ms, rows = res.rows.len(), "Feed query fetched"),
            Err(e) => warn!(query_id, duration_ms, error = %e, "Feed query failed"),
        }
        result
    }

    async fn request(&self, query_id: u64) -> Result<FeedResult, FeedError> {
        let body = self
            .http
            .get(self.results_url(query_id))
            .header("X-Dune-API-Key", &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FeedError::unavailable(query_id, e.to_string()))?
            .json::<QueryResults>()
            .await
            .map_err(|e| FeedError::unavailable(query_id, format!("malformed body: {e}")))?;

        let ResultBody { rows, metadata } = body.result;
        let mut columns = metadata.map(|m| m.column_names).unwrap_or_default();
        if columns.is_empty() {
            columns = rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default();
        }
        Ok(FeedResult { columns, rows })
    }
}
