use utoipa::OpenApi;

use crate::routes::{gallery, health, images, options};

#[derive(OpenApi)]
#[openapi(info(
    title = "studio-server",
    description = "Structured image generation API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(images::ImagesApi::openapi());
    root.merge(gallery::GalleryApi::openapi());
    root.merge(options::OptionsApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
