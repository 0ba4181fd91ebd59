//! Router configuration for the HTTP API.
//!
//! This module sets up all routes and middleware (correlation ids, tracing,
//! security headers, origin policy, role guards, compression) and returns the
//! axum router ready for serving.

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::middleware::{origin_guard, require_admin, require_pro, security_headers};
use super::state::AppState;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let correlation_id = HeaderName::from_static(CORRELATION_ID_HEADER);

    let events = Router::new()
        .route(
            "/children/{child_id}/events",
            get(handlers::list_child_events).post(handlers::create_child_event),
        )
        .route(
            "/children/{child_id}/events/{event_id}",
            patch(handlers::patch_child_event),
        )
        .route_layer(from_fn_with_state(state.clone(), require_pro));

    let admin = Router::new()
        .route("/users/debug", get(handlers::users_debug))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let api = Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(events)
        .merge(admin);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(correlation_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let correlation_id = request
                    .headers()
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    correlation_id = %correlation_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(correlation_id))
        .layer(from_fn(security_headers))
        .layer(from_fn_with_state(state.origins.clone(), origin_guard))
        .layer(CompressionLayer::new());

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware)
        .with_state(state)
}
