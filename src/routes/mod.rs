//! HTTP routes
//!
//! One router per feature, mounted on a shared [`AppState`].

pub mod forecast_routes;
pub mod gateway_routes;
pub mod orchestration_routes;
pub mod scheduling_routes;
pub mod telemetry_routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use crate::state::AppState;

/// The complete application: every router, CORS and request tracing
pub fn create_app(state: AppState) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(&state.config.cors_origins)
    };

    let api = Router::new()
        .merge(scheduling_routes::create_scheduling_router())
        .merge(orchestration_routes::create_orchestration_router())
        .merge(telemetry_routes::create_telemetry_router())
        .nest("/forecast", forecast_routes::create_forecast_router());

    Router::new()
        .merge(gateway_routes::create_gateway_router())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
