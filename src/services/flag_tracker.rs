//! Maintenance flags from telemetry
//!
//! Severity is the sum of independent threshold checks on one reading.
//! A flag is raised at severity 40 or more, at most one open flag per
//! vehicle; the store enforces that atomically.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ForecastConfig;
use crate::models::{
    MaintenanceFlag, NewMaintenanceFlag, NewTelemetrySample, TelemetrySample,
};
use crate::repositories::FleetStore;
use crate::utils::errors::{not_found_error, AppResult};

/// Severity score and the labels that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Unbounded sum, 130 at most
    pub severity: f64,
    pub risk_factors: Vec<String>,
}

impl RiskAssessment {
    /// `0.75 + severity/400`, clamped to 1.0
    pub fn confidence(&self) -> f64 {
        (0.75 + self.severity / 400.0).min(1.0)
    }
}

/// Readings the severity rules look at
#[derive(Debug, Clone, Copy, Default)]
pub struct Readings<'a> {
    pub oil_quality: Option<f64>,
    pub battery_percent: Option<f64>,
    pub brake_condition: Option<&'a str>,
    pub tire_pressure: Option<f64>,
}

impl<'a> From<&'a TelemetrySample> for Readings<'a> {
    fn from(sample: &'a TelemetrySample) -> Self {
        Self {
            oil_quality: sample.oil_quality,
            battery_percent: sample.battery_percent,
            brake_condition: sample.brake_condition.as_deref(),
            tire_pressure: sample.tire_pressure,
        }
    }
}

/// Score a reading; missing metrics contribute nothing
pub fn assess(readings: Readings<'_>) -> RiskAssessment {
    let mut severity = 0.0;
    let mut risk_factors = Vec::new();
    let mut add = |points: f64, label: &str| {
        severity += points;
        risk_factors.push(label.to_string());
    };

    if let Some(oil) = readings.oil_quality {
        if oil < 3.0 {
            add(40.0, "Critical oil quality");
        } else if oil < 5.0 {
            add(20.0, "Low oil quality");
        }
    }
    if let Some(battery) = readings.battery_percent {
        if battery < 50.0 {
            add(30.0, "Low battery");
        } else if battery < 70.0 {
            add(15.0, "Battery needs attention");
        }
    }
    match readings.brake_condition {
        Some("Poor") => add(35.0, "Poor brake condition"),
        Some("Warning") => add(20.0, "Brake warning"),
        _ => {}
    }
    if let Some(tire) = readings.tire_pressure {
        if tire < 28.0 {
            add(25.0, "Very low tire pressure");
        } else if tire < 30.0 {
            add(10.0, "Low tire pressure");
        }
    }

    RiskAssessment { severity, risk_factors }
}

/// Result of ingesting one reading
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub sample: TelemetrySample,
    pub flag: Option<MaintenanceFlag>,
}

#[derive(Clone)]
pub struct FlagTracker {
    store: Arc<dyn FleetStore>,
    threshold: f64,
}

impl FlagTracker {
    pub fn new(store: Arc<dyn FleetStore>, config: &ForecastConfig) -> Self {
        Self {
            store,
            threshold: config.flag_severity_threshold,
        }
    }

    /// Raise a flag for this reading if it is severe enough and the vehicle
    /// has no open flag. The stored severity is capped at 100.
    pub async fn evaluate(&self, sample: &TelemetrySample) -> AppResult<Option<MaintenanceFlag>> {
        let assessment = assess(Readings::from(sample));
        if assessment.severity < self.threshold {
            return Ok(None);
        }

        let confidence = assessment.confidence();
        let flag = self
            .store
            .insert_flag_if_absent(NewMaintenanceFlag {
                vehicle_id: sample.vehicle_id.clone(),
                flagged_at: Utc::now(),
                confidence,
                risk_factors: assessment.risk_factors,
                severity_score: assessment.severity.min(100.0),
            })
            .await?;

        match &flag {
            Some(f) => info!(
                "🚩 Flagged {} for maintenance (severity: {})",
                f.vehicle_id, assessment.severity
            ),
            None => debug!("{} already has an open flag", sample.vehicle_id),
        }
        Ok(flag)
    }

    /// Link a flag to the booking that handles it; `resolved_at` is left alone
    pub async fn resolve(&self, flag_id: i64, booking_id: &str) -> AppResult<MaintenanceFlag> {
        self.store.resolve_flag(flag_id, booking_id).await
    }

    /// Persist a reading for a known vehicle and evaluate it
    pub async fn ingest(&self, sample: NewTelemetrySample) -> AppResult<IngestOutcome> {
        if self.store.get_vehicle(&sample.vehicle_id).await?.is_none() {
            return Err(not_found_error("Vehicle", &sample.vehicle_id));
        }
        let sample = self.store.insert_telemetry(sample).await?;
        let flag = self.evaluate(&sample).await?;
        debug!("📊 Telemetry ingested for {}", sample.vehicle_id);
        Ok(IngestOutcome { sample, flag })
    }

    pub async fn unresolved(&self) -> AppResult<Vec<MaintenanceFlag>> {
        self.store.list_unresolved_flags().await
    }

    /// Newest readings first
    pub async fn recent_telemetry(
        &self,
        vehicle_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<TelemetrySample>> {
        self.store.list_telemetry(vehicle_id, limit).await
    }
}
