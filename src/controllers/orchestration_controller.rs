use validator::Validate;

use crate::dto::orchestration_dto::{
    FullCycleRequest, FullCycleResponse, NotificationListResponse, NotificationsQuery,
    ScheduleFlaggedResponse, SendNotificationRequest, SendNotificationResponse,
};
use crate::dto::ApiResponse;
use crate::models::{DeliveryStatus, NotificationTemplate};
use crate::services::{NotificationService, OrchestratorService};
use crate::utils::errors::AppError;

const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;

pub struct OrchestrationController {
    orchestrator: OrchestratorService,
    notifications: NotificationService,
}

impl OrchestrationController {
    pub fn new(orchestrator: OrchestratorService, notifications: NotificationService) -> Self {
        Self {
            orchestrator,
            notifications,
        }
    }

    pub async fn full_cycle(&self, request: FullCycleRequest) -> Result<ApiResponse<FullCycleResponse>, AppError> {
        request.validate()?;
        let forecast_days = request
            .forecast_days
            .unwrap_or(self.orchestrator.config().default_forecast_days);
        let results = self
            .orchestrator
            .run_full_cycle(forecast_days, request.auto_confirm.unwrap_or(false), request.regions)
            .await;
        Ok(ApiResponse::success(FullCycleResponse { results }))
    }

    pub async fn schedule_flagged(&self) -> Result<ApiResponse<ScheduleFlaggedResponse>, AppError> {
        let outcome = self.orchestrator.schedule_flagged().await?;
        let nothing_flagged = outcome.scheduled_count() == 0 && outcome.failed_count() == 0;
        let response = ScheduleFlaggedResponse {
            scheduled_count: outcome.scheduled_count(),
            failed_count: outcome.failed_count(),
            bookings: outcome.bookings,
            failed_vehicles: outcome.failed_vehicles,
        };
        if nothing_flagged {
            return Ok(ApiResponse::success_with_message(
                response,
                "No vehicles flagged for maintenance",
            ));
        }
        Ok(ApiResponse::success(response))
    }

    pub async fn send_notification(
        &self,
        request: SendNotificationRequest,
    ) -> Result<SendNotificationResponse, AppError> {
        request.validate()?;
        let template = match request.notification_type.as_deref() {
            Some(kind) => kind.parse()?,
            None => NotificationTemplate::BookingConfirmation,
        };
        let booking_id = request.booking_id.unwrap_or_default();

        let notification = self.notifications.send(&booking_id, template).await?;
        Ok(SendNotificationResponse {
            success: notification.status == DeliveryStatus::Sent.as_str(),
            booking_id,
            notification_type: template.as_str().to_string(),
            notification,
        })
    }

    pub async fn list_notifications(
        &self,
        query: NotificationsQuery,
    ) -> Result<NotificationListResponse, AppError> {
        query.validate()?;
        let notifications = self
            .notifications
            .list(
                query.booking_id.as_deref(),
                query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT),
            )
            .await?;
        Ok(NotificationListResponse {
            count: notifications.len(),
            notifications,
        })
    }
}
