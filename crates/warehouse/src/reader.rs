//! Read-only `ClickHouse` reader for metric views
//! Results are fetched in `JSON` format so column names survive the trip

use std::time::Instant;

use clickhouse::Client;
use derive_more::Debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};
use url::Url;

use crate::{
    connection::Session,
    error::WarehouseError,
    query::{CompiledQuery, EventSource, QuerySpec},
};

/// Output format requested for every query
const RESULT_FORMAT: &str = "JSON";

/// One result row keyed by the column names the warehouse returned
pub type RawRow = Map<String, Value>;

#[derive(Deserialize)]
struct JsonResultSet {
    data: Vec<RawRow>,
}

/// Warehouse reader holding the process-wide session
#[derive(Clone, Debug)]
pub struct WarehouseReader {
    /// Base client, authenticated per query
    #[debug(skip)]
    base: Client,
    session: Session,
    source: EventSource,
}

impl WarehouseReader {
    /// Create a reader for the `ClickHouse` HTTP endpoint at `url`.
    pub fn new(url: Url, session: Session, source: EventSource) -> Self {
        let mut base = Client::default().with_url(url);
        if let Some(db) = session.database() {
            base = base.with_database(db);
        }
        Self { base, session, source }
    }

    /// Session used to authenticate requests.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Tables and allowlist compiled queries read from.
    pub const fn source(&self) -> &EventSource {
        &self.source
    }

    /// Compile `spec` and return its rows.
    pub async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<RawRow>, WarehouseError> {
        let query = spec.compile(&self.source);
        self.execute(&query).await
    }

    /// Run an already compiled query.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<Vec<RawRow>, WarehouseError> {
        let start = Instant::now();

        let result = self.fetch_json(query).await;

        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(rows) => {
                debug!(
                    query = %query.sql,
                    duration_ms,
                    rows = rows.len(),
                    "ClickHouse query executed"
                )
            }
            Err(e) => error!(query = %query.sql, duration_ms, error = %e, "ClickHouse query failed"),
        }
        result
    }

    async fn fetch_json(&self, query: &CompiledQuery) -> Result<Vec<RawRow>, WarehouseError> {
        let client = self.base.clone().with_access_token(self.session.token()?);
        let mut request = client.query(&query.sql);
        for param in &query.params {
            request = request.param(&param.name, param.value.as_str());
        }
        let body = request.fetch_bytes(RESULT_FORMAT)?.collect().await?;
        let set: JsonResultSet = serde_json::from_slice(&body)
            .map_err(|e| WarehouseError::QueryExecutionFailed(format!("malformed result: {e}")))?;
        Ok(set.data)
    }
}
