//! Memo cache maintenance

use api_types::CacheClearResponse;
use axum::{Json, extract::State};

use crate::state::ApiState;

#[utoipa::path(
    post,
    path = "/cache/clear",
    responses(
        (status = 200, description = "Number of cached views dropped", body = CacheClearResponse)
    ),
    tag = "routerscope"
)]
/// Drop every memoized view result
pub async fn clear_cache(State(state): State<ApiState>) -> Json<CacheClearResponse> {
    let cleared = state.cache.clear();
    tracing::info!(cleared, "Memo cache cleared");
    Json(CacheClearResponse { cleared })
}
