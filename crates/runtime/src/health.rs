//! Liveness endpoint

use api_types::HealthResponse;
use axum::Json;

/// Health check handler returning `{ "status": "ok" }`.
pub async fn handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_owned() })
}
