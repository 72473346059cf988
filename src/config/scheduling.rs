//! Engine tunables
//!
//! Typed configuration for the scheduling engine, the forecast engine, the
//! orchestration workflow and the telemetry simulator. Each block checks its
//! own invariants in `validate()`.

use chrono::Duration;
use serde::Serialize;
use std::time::Duration as StdDuration;

use crate::models::CustomerType;
use crate::utils::errors::{validation_error, AppResult};

/// Priority weights, expressed in percent
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriorityWeights {
    pub severity: f64,
    pub customer_type: f64,
    pub proximity: f64,
    pub wait_penalty: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            severity: 40.0,
            customer_type: 20.0,
            proximity: 25.0,
            wait_penalty: 15.0,
        }
    }
}

impl PriorityWeights {
    pub fn total(&self) -> f64 {
        self.severity + self.customer_type + self.proximity + self.wait_penalty
    }
}

/// Customer factor per recognised tier
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CustomerFactors {
    pub fleet: f64,
    pub premium: f64,
    pub standard: f64,
}

impl Default for CustomerFactors {
    fn default() -> Self {
        Self {
            fleet: 30.0,
            premium: 20.0,
            standard: 10.0,
        }
    }
}

impl CustomerFactors {
    pub fn for_tier(&self, tier: CustomerType) -> f64 {
        match tier {
            CustomerType::Fleet => self.fleet,
            CustomerType::Premium => self.premium,
            CustomerType::Standard => self.standard,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulingConfig {
    pub weights: PriorityWeights,
    pub customer_factors: CustomerFactors,
    /// Stand-in for distance to the center
    pub proximity_score: f64,
    /// Severity assumed when a vehicle has no flag
    pub default_severity: f64,
    pub wait_points_per_day: f64,
    pub slot_duration_minutes: i64,
    pub default_service_type: String,
    /// Try centers in random order per vehicle
    pub shuffle_centers: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            customer_factors: CustomerFactors::default(),
            proximity_score: 75.0,
            default_severity: 50.0,
            wait_points_per_day: 5.0,
            slot_duration_minutes: 60,
            default_service_type: "general_inspection".to_string(),
            shuffle_centers: true,
        }
    }
}

impl SchedulingConfig {
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_duration_minutes)
    }

    pub fn validate(&self) -> AppResult<()> {
        let total = self.weights.total();
        if (total - 100.0).abs() > 1e-9 {
            return Err(validation_error(format!(
                "Priority weights must sum to 100, got {}",
                total
            )));
        }
        let weights = [
            self.weights.severity,
            self.weights.customer_type,
            self.weights.proximity,
            self.weights.wait_penalty,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(validation_error("Priority weights must be non-negative"));
        }
        if self.slot_duration_minutes <= 0 {
            return Err(validation_error("slot_duration_minutes must be positive"));
        }
        if self.wait_points_per_day < 0.0 {
            return Err(validation_error("wait_points_per_day must be non-negative"));
        }
        if self.default_service_type.trim().is_empty() {
            return Err(validation_error("default_service_type must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastConfig {
    pub default_forecast_days: i64,
    pub lookback_days: i64,
    /// Distinct booking days needed before a trend is computed
    pub min_trend_days: usize,
    /// Relative change between halves that counts as a trend
    pub trend_tolerance: f64,
    pub increasing_multiplier: f64,
    pub decreasing_multiplier: f64,
    pub telemetry_window_days: i64,
    pub flag_severity_threshold: f64,
    pub operating_hours_per_day: f64,
    pub capacity_window_days: i64,
    pub high_confidence_bookings: i64,
    pub medium_confidence_bookings: i64,
    pub high_confidence: f64,
    pub medium_confidence: f64,
    pub low_confidence: f64,
    /// Utilization fraction above which feedback raises the multiplier
    pub capacity_threshold_high: f64,
    /// Utilization fraction below which feedback lowers the multiplier
    pub capacity_threshold_low: f64,
    pub multiplier_adjustment: f64,
    /// Center utilization percent reported as `high`
    pub center_high_percent: f64,
    /// Center utilization percent reported as `medium`
    pub center_medium_percent: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_forecast_days: 7,
            lookback_days: 30,
            min_trend_days: 7,
            trend_tolerance: 0.1,
            increasing_multiplier: 1.2,
            decreasing_multiplier: 0.8,
            telemetry_window_days: 7,
            flag_severity_threshold: 40.0,
            operating_hours_per_day: 10.0,
            capacity_window_days: 7,
            high_confidence_bookings: 20,
            medium_confidence_bookings: 10,
            high_confidence: 0.85,
            medium_confidence: 0.70,
            low_confidence: 0.50,
            capacity_threshold_high: 0.9,
            capacity_threshold_low: 0.5,
            multiplier_adjustment: 0.1,
            center_high_percent: 80.0,
            center_medium_percent: 50.0,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.default_forecast_days <= 0 || self.lookback_days <= 0 {
            return Err(validation_error("Forecast and lookback windows must be positive"));
        }
        if self.telemetry_window_days <= 0 || self.capacity_window_days <= 0 {
            return Err(validation_error("Telemetry and capacity windows must be positive"));
        }
        if self.min_trend_days < 2 {
            return Err(validation_error("min_trend_days must be at least 2"));
        }
        for confidence in [self.high_confidence, self.medium_confidence, self.low_confidence] {
            if confidence <= 0.0 || confidence > 1.0 {
                return Err(validation_error("Confidence levels must lie in (0, 1]"));
            }
        }
        if self.capacity_threshold_low >= self.capacity_threshold_high {
            return Err(validation_error(
                "capacity_threshold_low must be below capacity_threshold_high",
            ));
        }
        if self.center_medium_percent >= self.center_high_percent {
            return Err(validation_error(
                "center_medium_percent must be below center_high_percent",
            ));
        }
        if self.operating_hours_per_day <= 0.0 {
            return Err(validation_error("operating_hours_per_day must be positive"));
        }
        if self.increasing_multiplier <= 0.0 || self.decreasing_multiplier <= 0.0 {
            return Err(validation_error("Trend multipliers must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationConfig {
    pub default_forecast_days: i64,
    pub forecast_timeout: StdDuration,
    pub scheduling_timeout: StdDuration,
    pub capacity_timeout: StdDuration,
    pub feedback_timeout: StdDuration,
    /// Center utilization percent above which feedback is pushed
    pub feedback_utilization_percent: f64,
    /// Scheduling window used by `schedule_flagged`
    pub schedule_flagged_days: i64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_forecast_days: 7,
            forecast_timeout: StdDuration::from_secs(10),
            scheduling_timeout: StdDuration::from_secs(30),
            capacity_timeout: StdDuration::from_secs(5),
            feedback_timeout: StdDuration::from_secs(5),
            feedback_utilization_percent: 80.0,
            schedule_flagged_days: 7,
        }
    }
}

impl OrchestrationConfig {
    pub fn validate(&self) -> AppResult<()> {
        let timeouts = [
            self.forecast_timeout,
            self.scheduling_timeout,
            self.capacity_timeout,
            self.feedback_timeout,
        ];
        if timeouts.iter().any(|t| t.is_zero()) {
            return Err(validation_error("Step timeouts must be non-zero"));
        }
        if self.default_forecast_days <= 0 || self.schedule_flagged_days <= 0 {
            return Err(validation_error("Scheduling windows must be positive"));
        }
        if self.default_forecast_days > 365 || self.schedule_flagged_days > 365 {
            return Err(validation_error("Scheduling windows cannot exceed 365 days"));
        }
        if !(0.0..=100.0).contains(&self.feedback_utilization_percent) {
            return Err(validation_error("feedback_utilization_percent must lie in [0, 100]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    pub interval_seconds: u64,
    /// Vehicles sampled per tick
    pub batch_size: i64,
    /// Share of readings generated from a degraded profile
    pub degradation_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 100,
            batch_size: 3,
            degradation_probability: 0.3,
        }
    }
}

impl SimulatorConfig {
    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(self.interval_seconds)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.interval_seconds == 0 {
            return Err(validation_error("Simulator interval must be at least one second"));
        }
        if self.batch_size <= 0 {
            return Err(validation_error("Simulator batch size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.degradation_probability) {
            return Err(validation_error("degradation_probability must lie in [0, 1]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SchedulingConfig::default().validate().unwrap();
        ForecastConfig::default().validate().unwrap();
        OrchestrationConfig::default().validate().unwrap();
        SimulatorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_weights_must_sum_to_hundred() {
        let mut config = SchedulingConfig::default();
        config.weights.proximity = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_customer_factors() {
        let factors = CustomerFactors::default();
        assert_eq!(factors.for_tier(CustomerType::Fleet), 30.0);
        assert_eq!(factors.for_tier(CustomerType::Premium), 20.0);
        assert_eq!(factors.for_tier(CustomerType::Standard), 10.0);
    }

    #[test]
    fn test_simulator_rejects_zero_interval() {
        let config = SimulatorConfig {
            interval_seconds: 0,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
