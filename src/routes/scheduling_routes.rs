use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::scheduling_controller::SchedulingController;
use crate::dto::scheduling_dto::{
    BookingListResponse, BookingResponse, BookingsQuery, ConfirmBookingRequest,
    ScheduleBatchRequest, ScheduleBatchResponse, SlotsQuery, SlotsResponse,
};
use crate::dto::ApiResponse;
use crate::models::BookingTransition;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_scheduling_router() -> Router<AppState> {
    Router::new()
        .route("/getSlots", get(get_slots))
        .route("/schedule_batch", post(schedule_batch))
        .route("/confirmBooking", post(confirm_booking))
        .route("/bookings", get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/start", post(start_booking))
        .route("/bookings/:id/complete", post(complete_booking))
}

async fn get_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.get_slots(query).await?))
}

async fn schedule_batch(
    State(state): State<AppState>,
    Json(request): Json<ScheduleBatchRequest>,
) -> Result<Json<ApiResponse<ScheduleBatchResponse>>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.schedule_batch(request).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.confirm_booking(request).await?))
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingListResponse>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.list_bookings(query).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.get_booking(&id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.transition(&id, BookingTransition::Cancel).await?))
}

async fn start_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.transition(&id, BookingTransition::Start).await?))
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = SchedulingController::new(state.scheduling.clone());
    Ok(Json(controller.transition(&id, BookingTransition::Complete).await?))
}
