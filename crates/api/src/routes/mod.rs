//! HTTP routes

pub mod health;
pub mod shell;
pub mod tenants;

use axum::{
    http::{header, HeaderMap, Uri},
    middleware,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    error::ApiError,
    routing::CurrentOrigin,
    security::security_headers_middleware,
    state::AppState,
};

/// Host the client asked for.
/// Checks the proxy header first, then `Host`, then the URI authority (HTTP/2).
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

/// Public origin of the request, using the configured protocol
pub fn request_origin(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<CurrentOrigin, ApiError> {
    let host = request_host(headers, uri)
        .ok_or_else(|| ApiError::BadRequest("Missing Host header".to_string()))?;
    Ok(CurrentOrigin::new(&state.config.public_protocol, &host)?)
}

/// Create all routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let api_v1_routes = Router::new()
        .route("/resolve", get(tenants::resolve_host))
        .route("/tenants/:label/public-url", get(tenants::public_url))
        .route(
            "/tenants/:label/routing-mode",
            get(tenants::get_routing_mode).put(tenants::set_routing_mode),
        );

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        // Every other path is a page: tenant blog or admin app, decided by host
        .fallback(shell::page_shell)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
