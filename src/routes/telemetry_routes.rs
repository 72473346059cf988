use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::telemetry_controller::TelemetryController;
use crate::dto::telemetry_dto::{
    IngestTelemetryRequest, IngestTelemetryResponse, SimulatorStartResponse, TelemetryListResponse,
    TelemetryQuery,
};
use crate::dto::ApiResponse;
use crate::services::telemetry_simulator::SimulatorStatus;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_telemetry_router() -> Router<AppState> {
    Router::new()
        .route("/ingest_telemetry", post(ingest_telemetry))
        .route("/telemetry", get(list_telemetry))
        .route("/simulator/start", post(start_simulator))
        .route("/simulator/stop", post(stop_simulator))
        .route("/simulator/status", get(simulator_status))
}

fn controller(state: &AppState) -> TelemetryController {
    TelemetryController::new(state.flags.clone(), state.simulator.clone())
}

async fn ingest_telemetry(
    State(state): State<AppState>,
    Json(request): Json<IngestTelemetryRequest>,
) -> Result<Json<ApiResponse<IngestTelemetryResponse>>, AppError> {
    Ok(Json(controller(&state).ingest(request).await?))
}

async fn list_telemetry(
    State(state): State<AppState>,
    Query(query): Query<TelemetryQuery>,
) -> Result<Json<TelemetryListResponse>, AppError> {
    Ok(Json(controller(&state).list(query).await?))
}

async fn start_simulator(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SimulatorStartResponse>>, AppError> {
    Ok(Json(controller(&state).start_simulator()?))
}

async fn stop_simulator(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, AppError> {
    Ok(Json(controller(&state).stop_simulator()?))
}

async fn simulator_status(State(state): State<AppState>) -> Result<Json<SimulatorStatus>, AppError> {
    Ok(Json(controller(&state).simulator_status().await?))
}
