use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::orchestration_controller::OrchestrationController;
use crate::dto::orchestration_dto::{
    FullCycleRequest, FullCycleResponse, NotificationListResponse, NotificationsQuery,
    ScheduleFlaggedResponse, SendNotificationRequest, SendNotificationResponse,
};
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_orchestration_router() -> Router<AppState> {
    Router::new()
        .route("/orchestrate/full_cycle", post(full_cycle))
        .route("/orchestrate/schedule_flagged", post(schedule_flagged))
        .route("/notifications/send", post(send_notification))
        .route("/notifications", get(list_notifications))
}

fn controller(state: &AppState) -> OrchestrationController {
    OrchestrationController::new(state.orchestrator.clone(), state.notifications.clone())
}

async fn full_cycle(
    State(state): State<AppState>,
    request: Option<Json<FullCycleRequest>>,
) -> Result<Json<ApiResponse<FullCycleResponse>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(controller(&state).full_cycle(request).await?))
}

async fn schedule_flagged(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ScheduleFlaggedResponse>>, AppError> {
    Ok(Json(controller(&state).schedule_flagged().await?))
}

async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, AppError> {
    Ok(Json(controller(&state).send_notification(request).await?))
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    Ok(Json(controller(&state).list_notifications(query).await?))
}
