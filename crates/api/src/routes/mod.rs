//! API route definitions

pub mod cache;
pub mod nft;
pub mod views;

use crate::{ApiDoc, state::ApiState};
use axum::{
    Router,
    routing::{get, post},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use cache::*;
use nft::*;
use views::*;

/// Build the router with all API endpoints.
pub fn router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/views/:view", get(view))
        .route("/dashboard", get(dashboard))
        .route("/nft", get(nft))
        .route("/cache/clear", post(clear_cache));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .with_state(state)
}
