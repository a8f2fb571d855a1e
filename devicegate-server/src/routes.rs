//! Router configuration module
//!
//! Configures the single authorization route, its fallbacks and middleware.

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers::{devices_handler, method_not_allowed, not_found};
use crate::state::AppState;

/// Path of the authorization endpoint.
pub const DEVICES_PATH: &str = "/devices";

/// Create the application router with default config (for testing)
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &Config::default())
}

/// Create the application router with custom configuration
pub fn create_router_with_config(state: AppState, config: &Config) -> Router {
    // The configured limit replaces axum's built-in 2 MiB extractor limit
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_kb * 1024);

    Router::new()
        .route(
            DEVICES_PATH,
            post(devices_handler).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
