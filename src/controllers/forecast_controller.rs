use chrono::Utc;
use validator::Validate;

use crate::dto::forecast_dto::{
    CapacityQuery, CapacityResponse, FeedbackRequest, ForecastListResponse,
    GenerateForecastRequest, GenerateForecastResponse, RegionalForecastQuery,
};
use crate::dto::ApiResponse;
use crate::services::forecast_service::FeedbackOutcome;
use crate::services::ForecastService;
use crate::utils::errors::AppError;

pub struct ForecastController {
    service: ForecastService,
}

impl ForecastController {
    pub fn new(service: ForecastService) -> Self {
        Self { service }
    }

    pub async fn generate(
        &self,
        request: GenerateForecastRequest,
    ) -> Result<ApiResponse<GenerateForecastResponse>, AppError> {
        request.validate()?;
        let days = request
            .forecast_days
            .unwrap_or(self.service.config().default_forecast_days);
        let forecasts = self.service.generate_forecasts(request.regions, days).await?;
        Ok(ApiResponse::success(GenerateForecastResponse {
            forecasts,
            generated_at: Utc::now(),
        }))
    }

    pub async fn regional(&self, query: RegionalForecastQuery) -> Result<ForecastListResponse, AppError> {
        query.validate()?;
        let days = query.days.unwrap_or(self.service.config().default_forecast_days);
        let forecasts = self.service.latest_regional_forecasts(days).await?;
        Ok(ForecastListResponse {
            count: forecasts.len(),
            forecasts,
        })
    }

    pub async fn capacity(&self, query: CapacityQuery) -> Result<CapacityResponse, AppError> {
        let region = query.region.as_deref().filter(|r| !r.trim().is_empty());
        Ok(CapacityResponse {
            capacity_forecast: self.service.capacity_by_center(region).await?,
            timestamp: Utc::now(),
        })
    }

    pub async fn feedback(&self, request: FeedbackRequest) -> Result<ApiResponse<FeedbackOutcome>, AppError> {
        request.validate()?;
        let outcome = self.service.process_feedback(
            request.region.as_deref().unwrap_or_default(),
            request.capacity_utilization.unwrap_or(0.0),
            request.actual_demand,
        );
        Ok(ApiResponse::success_with_message(outcome, "Feedback processed successfully"))
    }
}
