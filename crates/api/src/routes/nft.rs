//! NFT mint campaign endpoint

use api_types::{ErrorResponse, NftResponse};
use axum::{Json, extract::State};

use crate::{helpers::SectionError, sections::nft_rows, state::ApiState};

#[utoipa::path(
    get,
    path = "/nft",
    responses(
        (status = 200, description = "NFT metrics; failed metrics are reported in their row", body = NftResponse),
        (status = 502, description = "Every NFT metric failed", body = ErrorResponse)
    ),
    tag = "routerscope"
)]
/// NFT mint campaign metrics from the hosted query API
pub async fn nft(State(state): State<ApiState>) -> Result<Json<NftResponse>, ErrorResponse> {
    let metrics = state.feed.nft_metrics().await;
    if metrics.all_failed() {
        if let Err(e) = &metrics.total_minters {
            tracing::error!(error = %e, "NFT metrics unavailable");
            return Err(SectionError::Feed(e.clone()).into_error_response());
        }
    }
    Ok(Json(NftResponse { rows: nft_rows(&metrics) }))
}
