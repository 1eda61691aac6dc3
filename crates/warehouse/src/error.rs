//! Warehouse error kinds

use thiserror::Error;

/// Failures talking to the warehouse or preparing a session for it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    /// A required entry is missing from the secret store
    #[error("missing warehouse secret: {0}")]
    MissingSecret(&'static str),

    /// The configured private key could not be decoded or used for signing
    #[error("invalid warehouse private key: {0}")]
    InvalidPrivateKey(String),

    /// Transport, HTTP status or SQL failure, carrying the warehouse diagnostic
    #[error("query execution failed: {0}")]
    QueryExecutionFailed(String),
}

impl From<clickhouse::error::Error> for WarehouseError {
    fn from(e: clickhouse::error::Error) -> Self {
        Self::QueryExecutionFailed(e.to_string())
    }
}
