use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::SimulatorConfig;
use crate::models::{MaintenanceFlag, NewTelemetrySample, TelemetrySample};
use crate::utils::errors::AppResult;
use crate::utils::validation::parse_timestamp;

#[derive(Debug, Deserialize, Validate)]
pub struct IngestTelemetryRequest {
    #[validate(required(message = "vehicle_id is required"), length(min = 1))]
    pub vehicle_id: Option<String>,
    /// RFC 3339; defaults to now
    pub timestamp: Option<String>,
    #[validate(range(min = 0))]
    pub mileage: Option<i64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub engine_load: Option<f64>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub oil_quality: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_percent: Option<f64>,
    pub brake_condition: Option<String>,
    pub brake_temp: Option<f64>,
    #[validate(range(min = 0.0))]
    pub tire_pressure: Option<f64>,
    #[validate(range(min = 0.0))]
    pub fuel_consumption: Option<f64>,
}

impl IngestTelemetryRequest {
    pub fn into_sample(self) -> AppResult<NewTelemetrySample> {
        let timestamp = self.timestamp.as_deref().map(parse_timestamp).transpose()?;
        Ok(NewTelemetrySample {
            vehicle_id: self.vehicle_id.unwrap_or_default(),
            timestamp,
            mileage: self.mileage,
            engine_load: self.engine_load,
            oil_quality: self.oil_quality,
            battery_percent: self.battery_percent,
            brake_condition: self.brake_condition,
            brake_temp: self.brake_temp,
            tire_pressure: self.tire_pressure,
            fuel_consumption: self.fuel_consumption,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IngestTelemetryResponse {
    pub vehicle_id: String,
    pub flagged_for_maintenance: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<MaintenanceFlag>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TelemetryQuery {
    pub vehicle_id: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TelemetryListResponse {
    pub telemetry: Vec<TelemetrySample>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulatorStartResponse {
    pub config: SimulatorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_readings_rejected() {
        let request: IngestTelemetryRequest = serde_json::from_value(serde_json::json!({
            "vehicle_id": "V001",
            "oil_quality": 12.0
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_missing_vehicle_rejected() {
        let request: IngestTelemetryRequest =
            serde_json::from_value(serde_json::json!({ "oil_quality": 2.0 })).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_timestamp_parsing() {
        let request: IngestTelemetryRequest = serde_json::from_value(serde_json::json!({
            "vehicle_id": "V001",
            "timestamp": "2025-12-01T10:00:00Z"
        }))
        .unwrap();
        let sample = request.into_sample().unwrap();
        assert_eq!(sample.timestamp.unwrap().to_rfc3339(), "2025-12-01T10:00:00+00:00");
    }
}
