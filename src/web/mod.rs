//! # Web API
//!
//! Axum application wiring: routes, shared state, middleware, and error
//! conversion for the HTTP surface.

pub mod handlers;
pub mod middleware;
pub mod response_types;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

/// Build the complete application router with middleware applied
pub fn create_app(state: AppState) -> Router {
    let request_timeout = Duration::from_millis(state.config.request_timeout_ms);

    Router::new()
        .merge(routes::health_routes())
        .nest("/v1", routes::api_v1_routes())
        .layer(axum::middleware::from_fn(middleware::add_request_id))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
