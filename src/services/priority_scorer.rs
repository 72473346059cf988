//! Booking priority
//!
//! `score = w_sev·min(severity, 100) + w_cust·customer + w_prox·proximity
//!          - w_wait·(points_per_day·days_waiting)` with weights taken as
//! fractions of 100. The result is rounded to two decimals and may be
//! negative.

use crate::config::SchedulingConfig;
use crate::models::{MaintenanceFlag, SeverityLevel, Vehicle};

#[derive(Debug, Clone)]
pub struct PriorityScorer {
    config: SchedulingConfig,
}

impl PriorityScorer {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, vehicle: &Vehicle, flag: Option<&MaintenanceFlag>, days_waiting: i64) -> f64 {
        let severity = flag.map_or(self.config.default_severity, |f| f.severity_score);
        let customer = self
            .config
            .customer_factors
            .for_tier(vehicle.customer_tier());
        self.score_parts(severity, customer, days_waiting)
    }

    fn score_parts(&self, severity: f64, customer_factor: f64, days_waiting: i64) -> f64 {
        let w = &self.config.weights;
        let wait_penalty = self.config.wait_points_per_day * days_waiting.max(0) as f64;
        let raw = (w.severity / 100.0) * severity.min(100.0)
            + (w.customer_type / 100.0) * customer_factor
            + (w.proximity / 100.0) * self.config.proximity_score
            - (w.wait_penalty / 100.0) * wait_penalty;
        round2(raw)
    }

    pub fn severity_level(&self, severity_score: f64) -> SeverityLevel {
        SeverityLevel::from_score(severity_score)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::seed::sample_vehicle;
    use chrono::Utc;

    fn flag(severity: f64) -> MaintenanceFlag {
        MaintenanceFlag {
            flag_id: 1,
            vehicle_id: "V001".to_string(),
            flagged_at: Utc::now(),
            maintenance_required: true,
            confidence: 0.9,
            risk_factors: vec![],
            severity_score: severity,
            is_scheduled: false,
            scheduled_booking_id: None,
            resolved_at: None,
        }
    }

    fn scorer() -> PriorityScorer {
        PriorityScorer::new(SchedulingConfig::default())
    }

    #[test]
    fn test_reference_score() {
        // 0.4*80 + 0.2*30 + 0.25*75 - 0.15*(5*2) = 32 + 6 + 18.75 - 1.5
        let score = scorer().score(&sample_vehicle("V001", "fleet"), Some(&flag(80.0)), 2);
        assert_eq!(score, 55.25);
    }

    #[test]
    fn test_missing_flag_uses_default_severity() {
        // 0.4*50 + 0.2*10 + 18.75
        let score = scorer().score(&sample_vehicle("V001", "standard"), None, 0);
        assert_eq!(score, 40.75);
    }

    #[test]
    fn test_unknown_tier_scores_as_standard() {
        let s = scorer();
        let gold = s.score(&sample_vehicle("V001", "gold"), Some(&flag(60.0)), 1);
        let standard = s.score(&sample_vehicle("V001", "standard"), Some(&flag(60.0)), 1);
        assert_eq!(gold, standard);
    }

    #[test]
    fn test_severity_is_capped_at_hundred() {
        let s = scorer();
        let vehicle = sample_vehicle("V001", "premium");
        assert_eq!(
            s.score(&vehicle, Some(&flag(130.0)), 0),
            s.score(&vehicle, Some(&flag(100.0)), 0)
        );
    }

    #[test]
    fn test_long_wait_goes_negative() {
        // 0.4*10 + 0.2*10 + 18.75 - 0.15*(5*40) = -5.25
        let score = scorer().score(&sample_vehicle("V001", "standard"), Some(&flag(10.0)), 40);
        assert_eq!(score, -5.25);
    }

    #[test]
    fn test_monotone_in_severity_and_deterministic() {
        let s = scorer();
        let vehicle = sample_vehicle("V001", "fleet");
        let mut previous = f64::MIN;
        for severity in (0..=120).step_by(5) {
            let score = s.score(&vehicle, Some(&flag(severity as f64)), 3);
            assert_eq!(score, s.score(&vehicle, Some(&flag(severity as f64)), 3));
            assert!(score >= previous);
            previous = score;
        }
    }
}
