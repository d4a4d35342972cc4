//! HTTP router
//!
//! Route table plus the middleware stack shared by every response: request
//! ids, tracing, CORS and the fixed security headers.

use crate::api::{events, files, stats, users};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
    routing::{delete, get},
    Router,
};
use std::path::PathBuf;
use std::time::Instant;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Room for multipart boundaries and text fields on top of the file limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Headers set on every response
pub const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    ("x-xss-protection", "0"),
    (
        "permissions-policy",
        "geolocation=(), microphone=(), camera=()",
    ),
    (
        "content-security-policy",
        "default-src 'self' https:; script-src 'self' https:; connect-src 'self' https:; \
         img-src 'self' data: https:; style-src 'self' 'unsafe-inline' https:; \
         object-src 'none'; frame-ancestors 'none'; base-uri 'self';",
    ),
];

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

    let mut response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Build the application router
///
/// Paths no route matches are served from `static_dir` when it exists.
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut router = Router::new()
        .route("/api/health", get(stats::health_check))
        .route("/api/statistics", get(stats::get_statistics))
        // Users
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/users/:userId",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/:userId/events", get(events::list_user_events))
        // Events
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:eventId",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Files
        .route(
            "/api/events/:eventId/files",
            get(files::list_event_files).post(files::upload_file),
        )
        .route("/api/files/:fileId", delete(files::delete_file))
        .route("/api/files/:fileId/download", get(files::download_file));

    match static_dir {
        Some(dir) if dir.is_dir() => {
            info!("Serving static files from {}", dir.display());
            router = router.fallback_service(ServeDir::new(dir));
        }
        Some(dir) => warn!("Static directory {} not found, skipping", dir.display()),
        None => {}
    }

    router = router
        .layer(DefaultBodyLimit::max(body_limit))
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
        .layer(CorsLayer::permissive());

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router.with_state(state)
}
