use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::clients::Prediction;
use crate::controllers::gateway_controller::GatewayController;
use crate::dto::gateway_dto::HealthResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_gateway_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/report", post(report))
}

fn controller(state: &AppState) -> GatewayController {
    GatewayController::new(
        state.predictor.clone(),
        state.reports.clone(),
        state.store.clone(),
        state.simulator.clone(),
    )
}

async fn home() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "Vehicle Maintenance Scheduling API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(controller(&state).health().await)
}

async fn predict(
    State(state): State<AppState>,
    Json(features): Json<Value>,
) -> Result<Json<Prediction>, AppError> {
    Ok(Json(controller(&state).predict(features).await?))
}

async fn report(
    State(state): State<AppState>,
    Json(request): Json<Value>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(controller(&state).report(request).await?))
}
