//! Generation history.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use studio_core::{ImageRecord, Page};
use utoipa::{IntoParams, OpenApi};

use crate::error::{ErrorBody, ServerError};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_gallery, delete_image))]
pub struct GalleryApi;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gallery", get(list_gallery))
        .route("/gallery/{id}", delete(delete_image))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct GalleryQuery {
    /// Zero-based page (default 0).
    pub page: Option<usize>,
    /// Page size (default 20, max 100).
    pub size: Option<usize>,
}

/// Generated images, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/gallery",
    tag = "gallery",
    params(GalleryQuery),
    responses(
        (status = 200, description = "One page of records", body = Page<ImageRecord>),
        (status = 400, description = "Malformed query", body = ErrorBody),
    )
)]
pub async fn list_gallery(
    State(state): State<AppState>,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> Result<Json<Page<ImageRecord>>, ServerError> {
    let Query(query) = query?;
    Ok(Json(state.gallery.list(query.page, query.size).await))
}

/// Delete a record and its stored file.
#[utoipa::path(
    delete,
    path = "/api/v1/gallery/{id}",
    tag = "gallery",
    params(("id" = String, Path, description = "Image id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown image", body = ErrorBody),
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.gallery.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
