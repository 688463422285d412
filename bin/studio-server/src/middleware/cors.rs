use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer for a comma-separated origin list; `None` or an unparsable list
/// allows any origin.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_headers(Any).allow_methods(Any);

    let origins: Vec<HeaderValue> = allowed_origins
        .map(|list| {
            list.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        // Wildcard: fine for development; set STUDIO_CORS_ORIGINS in production.
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}
