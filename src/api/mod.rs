//! HTTP API surface
//!
//! Router construction plus the cross-cutting request layers: CORS for the
//! browser front end, request-id tracing, and the body-size limit for large
//! uploads.

pub mod health;
pub mod pdf;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::{Config, CorsConfig};
use crate::state::SharedState;

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// CORS for the known front-end origins.
///
/// Browsers hide non-simple response headers from script, so the download
/// metadata headers and `Content-Disposition` are exposed explicitly.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(ExposeHeaders::list([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-original-size"),
            HeaderName::from_static("x-compressed-size"),
            HeaderName::from_static("x-reduction-percentage"),
            HeaderName::from_static("x-quality-setting"),
        ]))
}

/// Build the application router with all routes and middleware configured.
pub fn router(state: SharedState, config: &Config) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/pdf/merge", post(pdf::merge_pdfs))
        .route("/api/pdf/compress", post(pdf::compress_pdf))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors_layer(&config.cors))
        // Multipart bodies default to 2 MB, far too small for scanned PDFs
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .with_state(state)
}
