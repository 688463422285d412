//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - the REST surface under `/api/v1`
//! - optional Swagger UI / OpenAPI document (disable with
//!   `STUDIO_ENABLE_SWAGGER=false`)
//! - CORS, body-limit and per-request trace-id layers

pub mod doc;
mod gallery;
mod health;
mod images;
mod options;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: AppState) -> Router {
    let api_router = Router::new()
        .merge(images::router())
        .merge(gallery::router())
        .merge(options::router())
        .merge(health::router());

    let mut app = Router::new().nest("/api/v1", api_router);

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(cors::cors_layer(state.config.cors_allowed_origins.as_deref()))
            .map_response(axum::response::IntoResponse::into_response)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes())),
    )
    .layer(middleware::from_fn(trace::trace_middleware))
    .with_state(state)
}
