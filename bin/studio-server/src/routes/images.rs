//! Image generation, editing and file retrieval.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use studio_core::{EditImageRequest, GenerateImageRequest, GeneratedImageResponse};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::{AppJson, ErrorBody, ServerError};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(generate_image, edit_image, image_file))]
pub struct ImagesApi;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images/generate", post(generate_image))
        .route("/images/edit", post(edit_image))
        .route("/images/{id}/file", get(image_file))
}

/// Generate a new image from a structured request.
#[utoipa::path(
    post,
    path = "/api/v1/images/generate",
    tag = "images",
    request_body = GenerateImageRequest,
    responses(
        (status = 200, description = "Generated image", body = GeneratedImageResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 429, description = "Provider quota exceeded", body = ErrorBody),
        (status = 501, description = "Mode not wired to a strategy", body = ErrorBody),
        (status = 502, description = "Provider failure", body = ErrorBody),
    )
)]
pub async fn generate_image(
    State(state): State<AppState>,
    AppJson(req): AppJson<GenerateImageRequest>,
) -> Result<Json<GeneratedImageResponse>, ServerError> {
    debug!(mode = ?req.operation_mode, "generate request");
    Ok(Json(state.orchestrator.generate(req).await?))
}

/// Edit or restyle an uploaded image.
#[utoipa::path(
    post,
    path = "/api/v1/images/edit",
    tag = "images",
    request_body = EditImageRequest,
    responses(
        (status = 200, description = "Edited image", body = GeneratedImageResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 429, description = "Provider quota exceeded", body = ErrorBody),
        (status = 502, description = "Provider failure", body = ErrorBody),
    )
)]
pub async fn edit_image(
    State(state): State<AppState>,
    AppJson(req): AppJson<EditImageRequest>,
) -> Result<Json<GeneratedImageResponse>, ServerError> {
    debug!(mode = ?req.operation_mode, "edit request");
    Ok(Json(state.orchestrator.edit(req).await?))
}

/// Raw PNG bytes of a generated image.
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}/file",
    tag = "images",
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "Unknown image", body = ErrorBody),
    )
)]
pub async fn image_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let bytes = state.orchestrator.image_file(&id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
        ],
        bytes,
    )
        .into_response())
}
