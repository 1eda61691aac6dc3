//! Data types for the Routerscope API.
//!
//! These structs define the JSON responses returned by the API server. Charts
//! are described declaratively so the dashboard front end can render them
//! without knowing how the numbers were computed.

#![allow(missing_docs)]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Problem details body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(
        r#type: impl Into<String>,
        title: impl Into<String>,
        status: StatusCode,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.into(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Filter selection a response was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilterSelection {
    pub granularity: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Bar,
    Line,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point {
    pub x: String,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Series {
    pub name: String,
    pub kind: SeriesKind,
    pub axis: Axis,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KpiCard {
    pub title: String,
    pub value: Option<f64>,
    pub unit: String,
}

/// Chart with a shared x axis: bars, lines and areas, optionally stacked and
/// optionally with a secondary y axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct XyChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub y2_title: Option<String>,
    pub stacked: bool,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankedBar {
    pub label: String,
    pub value: Option<f64>,
}

/// Horizontal bar chart of the top entries by one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankedBarChart {
    pub title: String,
    pub metric: String,
    pub bars: Vec<RankedBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub width: f64,
}

/// Directed chain-to-chain flow diagram with precomputed node positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FlowGraph {
    pub title: String,
    pub metric: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TableChart {
    pub title: String,
    pub columns: Vec<String>,
    #[schema(value_type = Vec<Vec<Object>>)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartSpec {
    Kpi(KpiCard),
    Xy(XyChart),
    RankedBar(RankedBarChart),
    FlowGraph(FlowGraph),
    Table(TableChart),
}

/// Failure confined to one dashboard section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionErrorBody {
    pub kind: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    pub id: String,
    pub title: String,
    pub charts: Vec<ChartSpec>,
    pub errors: Vec<SectionErrorBody>,
}

/// How the charts of a section are arranged in their row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    Cards,
    Columns,
    Tabs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardRow {
    pub layout: RowLayout,
    pub section: SectionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub filters: FilterSelection,
    pub rows: Vec<DashboardRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NftResponse {
    pub rows: Vec<DashboardRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheClearResponse {
    pub cleared: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body;

    #[test]
    fn chart_specs_are_tagged() {
        let chart = ChartSpec::Kpi(KpiCard {
            title: "Number of Swaps".to_owned(),
            value: Some(3.0),
            unit: "Txns".to_owned(),
        });
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["chart"], "kpi");
        assert_eq!(json["unit"], "Txns");
    }

    #[tokio::test]
    async fn error_response_uses_its_status() {
        let resp = ErrorResponse::new(
            "invalid-params",
            "Bad Request",
            StatusCode::BAD_REQUEST,
            "granularity: invalid",
        )
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "invalid-params");
        assert_eq!(json["status"], 400);
    }
}
