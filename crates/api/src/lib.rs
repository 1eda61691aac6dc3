//! HTTP API serving swap analytics as declarative chart specifications

pub mod cache;
pub mod helpers;
pub mod routes;
pub mod sections;
pub mod state;
pub mod validation;

use api_types::*;
use utoipa::OpenApi;
use warehouse::{Granularity, MetricView};

pub use cache::MemoCache;
pub use routes::router;
pub use state::ApiState;

/// `OpenAPI` documentation structure
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        routes::views::view,
        routes::views::dashboard,
        routes::nft::nft,
        routes::cache::clear_cache
    ),
    components(
        schemas(
            validation::FilterQuery,
            Granularity,
            MetricView,
            ErrorResponse,
            HealthResponse,
            FilterSelection,
            SeriesKind,
            Axis,
            Point,
            Series,
            KpiCard,
            XyChart,
            RankedBar,
            RankedBarChart,
            GraphNode,
            GraphEdge,
            FlowGraph,
            TableChart,
            ChartSpec,
            SectionErrorBody,
            SectionResponse,
            RowLayout,
            DashboardRow,
            DashboardResponse,
            NftResponse,
            CacheClearResponse
        )
    ),
    tags(
        (name = "routerscope", description = "Cross-chain swap analytics endpoints")
    ),
    info(
        title = "Routerscope API",
        description = "Swap, swapper and chain-flow metrics for the router contracts",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
