use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Forecast;
use crate::services::forecast_service::{CenterCapacity, RegionalForecast};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateForecastRequest {
    /// All active regions when absent
    pub regions: Option<Vec<String>>,
    #[validate(range(min = 1, max = 365))]
    pub forecast_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateForecastResponse {
    pub forecasts: Vec<RegionalForecast>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegionalForecastQuery {
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ForecastListResponse {
    pub forecasts: Vec<Forecast>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CapacityQuery {
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CapacityResponse {
    pub capacity_forecast: Vec<CenterCapacity>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(required(message = "region is required"), length(min = 1))]
    pub region: Option<String>,
    #[validate(range(min = 0))]
    pub actual_demand: Option<i64>,
    /// Fraction, not percent
    #[validate(range(min = 0.0, max = 1.0))]
    pub capacity_utilization: Option<f64>,
}
