//! Static option lists for client dropdowns.

use axum::routing::get;
use axum::{Json, Router};
use studio_core::StudioOptions;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_options))]
pub struct OptionsApi;

pub fn router() -> Router<AppState> {
    Router::new().route("/options", get(get_options))
}

#[utoipa::path(
    get,
    path = "/api/v1/options",
    tag = "options",
    responses((status = 200, description = "Every selectable option", body = StudioOptions))
)]
pub async fn get_options() -> Json<StudioOptions> {
    Json(StudioOptions::collect())
}
