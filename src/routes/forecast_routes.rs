use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::forecast_controller::ForecastController;
use crate::dto::forecast_dto::{
    CapacityQuery, CapacityResponse, FeedbackRequest, ForecastListResponse,
    GenerateForecastRequest, GenerateForecastResponse, RegionalForecastQuery,
};
use crate::dto::ApiResponse;
use crate::services::forecast_service::FeedbackOutcome;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_forecast_router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_forecasts))
        .route("/regional", get(regional_forecasts))
        .route("/capacity", get(capacity_forecast))
        .route("/feedback", post(process_feedback))
}

// No body means every active region
async fn generate_forecasts(
    State(state): State<AppState>,
    request: Option<Json<GenerateForecastRequest>>,
) -> Result<Json<ApiResponse<GenerateForecastResponse>>, AppError> {
    let controller = ForecastController::new(state.forecasts.clone());
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(controller.generate(request).await?))
}

async fn regional_forecasts(
    State(state): State<AppState>,
    Query(query): Query<RegionalForecastQuery>,
) -> Result<Json<ForecastListResponse>, AppError> {
    let controller = ForecastController::new(state.forecasts.clone());
    Ok(Json(controller.regional(query).await?))
}

async fn capacity_forecast(
    State(state): State<AppState>,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<CapacityResponse>, AppError> {
    let controller = ForecastController::new(state.forecasts.clone());
    Ok(Json(controller.capacity(query).await?))
}

async fn process_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackOutcome>>, AppError> {
    let controller = ForecastController::new(state.forecasts.clone());
    Ok(Json(controller.feedback(request).await?))
}
