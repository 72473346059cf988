use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Booking, Notification};
use crate::services::orchestrator::CycleReport;
use crate::services::scheduling_service::FailedVehicle;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct FullCycleRequest {
    #[validate(range(min = 1, max = 365))]
    pub forecast_days: Option<i64>,
    pub auto_confirm: Option<bool>,
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct FullCycleResponse {
    pub results: CycleReport,
}

#[derive(Debug, Serialize)]
pub struct ScheduleFlaggedResponse {
    pub scheduled_count: usize,
    pub failed_count: usize,
    pub bookings: Vec<Booking>,
    pub failed_vehicles: Vec<FailedVehicle>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(required(message = "booking_id is required"), length(min = 1))]
    pub booking_id: Option<String>,
    /// booking_confirmation, reminder or completion
    pub notification_type: Option<String>,
}

// `success` reflects delivery, so this one is not wrapped in ApiResponse
#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub success: bool,
    pub booking_id: String,
    pub notification_type: String,
    pub notification: Notification,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationsQuery {
    pub booking_id: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub count: usize,
}
