//! Warehouse-backed dashboard endpoints

use api_types::{DashboardResponse, ErrorResponse, SectionResponse};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use warehouse::MetricView;

use crate::{
    helpers::{render, section_title},
    sections::{dashboard as build_dashboard, load_view},
    state::ApiState,
    validation::{FilterQuery, resolve_filters},
};

fn parse_view(raw: &str) -> Result<MetricView, ErrorResponse> {
    raw.parse().map_err(|e: String| {
        tracing::warn!(view = raw, "Unknown view requested");
        ErrorResponse::new("not-found", "Not Found", StatusCode::NOT_FOUND, e)
    })
}

#[utoipa::path(
    get,
    path = "/views/{view}",
    params(
        ("view" = MetricView, Path, description = "Metric view to render"),
        FilterQuery
    ),
    responses(
        (status = 200, description = "Charts for one metric view", body = SectionResponse),
        (status = 400, description = "Invalid filter values", body = ErrorResponse),
        (status = 404, description = "Unknown view", body = ErrorResponse),
        (status = 500, description = "Query or schema error", body = ErrorResponse)
    ),
    tag = "routerscope"
)]
/// Render a single metric view for the selected filters
pub async fn view(
    Path(view): Path<String>,
    Query(query): Query<FilterQuery>,
    State(state): State<ApiState>,
) -> Result<Json<SectionResponse>, ErrorResponse> {
    let view = parse_view(&view)?;
    let params = resolve_filters(&query)?;
    let table = load_view(&state, view, params).await.map_err(|e| {
        tracing::error!(view = %view, error = %e, "Failed to load view");
        e.into_error_response()
    })?;
    Ok(Json(SectionResponse {
        id: view.as_str().to_owned(),
        title: section_title(view).to_owned(),
        charts: render(view, &table),
        errors: Vec::new(),
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard",
    params(FilterQuery),
    responses(
        (status = 200, description = "Every dashboard section; failures are reported per section", body = DashboardResponse),
        (status = 400, description = "Invalid filter values", body = ErrorResponse)
    ),
    tag = "routerscope"
)]
/// Render the full swap analytics dashboard
pub async fn dashboard(
    Query(query): Query<FilterQuery>,
    State(state): State<ApiState>,
) -> Result<Json<DashboardResponse>, ErrorResponse> {
    let params = resolve_filters(&query)?;
    Ok(Json(build_dashboard(&state, params).await))
}
