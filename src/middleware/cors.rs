use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Browser dashboards call the API cross-origin with bearer tokens.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_origin(Any)
}
