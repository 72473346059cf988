//! Maintenance flag and telemetry models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A vehicle flagged for maintenance by telemetry evaluation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceFlag {
    pub flag_id: i64,
    pub vehicle_id: String,
    pub flagged_at: DateTime<Utc>,
    pub maintenance_required: bool,
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    /// Within `[0, 100]`
    pub severity_score: f64,
    pub is_scheduled: bool,
    pub scheduled_booking_id: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl MaintenanceFlag {
    /// Unresolved flags are the ones the scheduler still has to act on
    pub fn is_unresolved(&self) -> bool {
        !self.is_scheduled && self.resolved_at.is_none()
    }
}

/// Insert payload for a new flag; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewMaintenanceFlag {
    pub vehicle_id: String,
    pub flagged_at: DateTime<Utc>,
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    pub severity_score: f64,
}

/// One telemetry reading, mirrors the `telemetry` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TelemetrySample {
    pub id: i64,
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    pub mileage: Option<i64>,
    /// 0.0 to 1.0
    pub engine_load: Option<f64>,
    /// 0 to 10
    pub oil_quality: Option<f64>,
    /// 0 to 100
    pub battery_percent: Option<f64>,
    /// Good, Warning, Poor
    pub brake_condition: Option<String>,
    pub brake_temp: Option<f64>,
    /// PSI
    pub tire_pressure: Option<f64>,
    pub fuel_consumption: Option<f64>,
}

/// Insert payload for a telemetry reading
#[derive(Debug, Clone, Default)]
pub struct NewTelemetrySample {
    pub vehicle_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub mileage: Option<i64>,
    pub engine_load: Option<f64>,
    pub oil_quality: Option<f64>,
    pub battery_percent: Option<f64>,
    pub brake_condition: Option<String>,
    pub brake_temp: Option<f64>,
    pub tire_pressure: Option<f64>,
    pub fuel_consumption: Option<f64>,
}
