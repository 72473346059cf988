//! Regional demand forecasting
//!
//! Estimates combine the booking history of a region's active centers with
//! the number of vehicles whose latest telemetry already looks severe.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ForecastConfig;
use crate::models::{Forecast, NewForecast, ServiceCenter, Trend};
use crate::repositories::FleetStore;
use crate::services::flag_tracker::{assess, Readings};
use crate::services::priority_scorer::round2;
use crate::utils::errors::{validation_error, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct DemandHistory {
    pub avg_daily_demand: f64,
    pub trend: Trend,
    pub total_capacity: i64,
    pub historical_bookings: i64,
}

impl DemandHistory {
    fn empty() -> Self {
        Self {
            avg_daily_demand: 0.0,
            trend: Trend::Stable,
            total_capacity: 0,
            historical_bookings: 0,
        }
    }
}

/// A stored forecast with the inputs that produced it
#[derive(Debug, Clone, Serialize)]
pub struct RegionalForecast {
    #[serde(flatten)]
    pub forecast: Forecast,
    pub historical_data: DemandHistory,
    pub predicted_flags: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct CenterCapacity {
    pub center_id: String,
    pub name: String,
    pub region: String,
    pub capacity_bays: i32,
    pub current_bookings: i64,
    pub utilization_percent: f64,
    pub status: CapacityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutcome {
    pub region: String,
    pub adjustment: f64,
}

/// Compare the two halves of the days that saw bookings.
///
/// `daily_counts` must be in date order. Fewer than `min_trend_days`
/// entries is always stable.
pub fn demand_trend(daily_counts: &[f64], config: &ForecastConfig) -> Trend {
    if daily_counts.len() < config.min_trend_days || daily_counts.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = daily_counts.split_at(daily_counts.len() / 2);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let (first_avg, second_avg) = (mean(first), mean(second));

    if second_avg > first_avg * (1.0 + config.trend_tolerance) {
        Trend::Increasing
    } else if second_avg < first_avg * (1.0 - config.trend_tolerance) {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[derive(Clone)]
pub struct ForecastService {
    store: Arc<dyn FleetStore>,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(store: Arc<dyn FleetStore>, config: ForecastConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub async fn analyze_historical_demand(&self, region: &str, lookback_days: i64) -> AppResult<DemandHistory> {
        let centers = self.store.list_active_centers(Some(region)).await?;
        if centers.is_empty() {
            return Ok(DemandHistory::empty());
        }
        let center_ids = center_ids(&centers);
        let since = Utc::now() - Duration::days(lookback_days);
        let created = self.store.booking_created_times(&center_ids, since).await?;

        let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for at in &created {
            *per_day.entry(at.date_naive()).or_default() += 1;
        }
        let daily: Vec<f64> = per_day.values().map(|n| *n as f64).collect();
        let avg_daily_demand = created.len() as f64 / daily.len().max(1) as f64;

        Ok(DemandHistory {
            avg_daily_demand: round2(avg_daily_demand),
            trend: demand_trend(&daily, &self.config),
            total_capacity: centers.iter().map(|c| c.capacity_bays as i64).sum(),
            historical_bookings: created.len() as i64,
        })
    }

    /// Vehicles whose latest reading would be flagged, projected linearly
    /// over `forecast_days`. Telemetry is not tied to a region, so every
    /// region sees the same fleet-wide rate.
    pub async fn predict_maintenance_flags(&self, region: &str, forecast_days: i64) -> AppResult<i64> {
        let window = self.config.telemetry_window_days.max(1);
        let since = Utc::now() - Duration::days(window);
        let latest = self.store.latest_telemetry_per_vehicle(since).await?;

        let at_risk = latest
            .iter()
            .filter(|sample| assess(Readings::from(*sample)).severity >= self.config.flag_severity_threshold)
            .count();
        let daily_rate = at_risk as f64 / window as f64;
        let projected = (daily_rate * forecast_days as f64).floor() as i64;
        debug!("{} vehicles at risk, projecting {} flags for {}", at_risk, projected, region);
        Ok(projected)
    }

    /// Share of the region's bay-hours taken by active bookings starting in
    /// the window, as a percentage within `[0, 100]`
    pub async fn capacity_utilization(
        &self,
        region: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> AppResult<f64> {
        let centers = self.store.list_active_centers(Some(region)).await?;
        if centers.is_empty() {
            return Ok(0.0);
        }
        let bays: i64 = centers.iter().map(|c| c.capacity_bays as i64).sum();
        let booked = self
            .store
            .count_active_bookings_starting(&center_ids(&centers), window_start, window_end)
            .await?;
        Ok(self.utilization_percent(booked, bays, (window_end - window_start).num_days()))
    }

    fn utilization_percent(&self, booked: i64, bays: i64, days: i64) -> f64 {
        let total_slots = self.config.operating_hours_per_day * bays as f64 * days as f64;
        if total_slots <= 0.0 {
            return 0.0;
        }
        round2((100.0 * booked as f64 / total_slots).clamp(0.0, 100.0))
    }

    pub async fn generate_forecast(&self, region: &str, forecast_days: i64) -> AppResult<RegionalForecast> {
        if forecast_days < 1 {
            return Err(validation_error("forecast_days must be at least 1"));
        }
        info!("📊 Generating forecast for region: {}", region);

        let history = self
            .analyze_historical_demand(region, self.config.lookback_days)
            .await?;
        let predicted_flags = self.predict_maintenance_flags(region, forecast_days).await?;

        let multiplier = match history.trend {
            Trend::Increasing => self.config.increasing_multiplier,
            Trend::Decreasing => self.config.decreasing_multiplier,
            Trend::Stable => 1.0,
        };
        let base_demand = history.avg_daily_demand * forecast_days as f64;
        let estimated_requests = ((base_demand + predicted_flags as f64) * multiplier).round() as i64;

        let window_start = Utc::now();
        let window_end = window_start + Duration::days(forecast_days);
        let capacity_utilization = self
            .capacity_utilization(region, window_start, window_end)
            .await?;

        let confidence_level = if history.historical_bookings >= self.config.high_confidence_bookings {
            self.config.high_confidence
        } else if history.historical_bookings >= self.config.medium_confidence_bookings {
            self.config.medium_confidence
        } else {
            self.config.low_confidence
        };

        let forecast = self
            .store
            .insert_forecast(NewForecast {
                region: region.to_string(),
                window_start,
                window_end,
                estimated_requests,
                confidence_level,
                capacity_utilization,
                generated_at: window_start,
            })
            .await?;

        Ok(RegionalForecast {
            forecast,
            historical_data: history,
            predicted_flags,
        })
    }

    /// One forecast per region; every region with an active center when
    /// none are given
    pub async fn generate_forecasts(
        &self,
        regions: Option<Vec<String>>,
        forecast_days: i64,
    ) -> AppResult<Vec<RegionalForecast>> {
        let regions = match regions.filter(|r| !r.is_empty()) {
            Some(regions) => regions,
            None => {
                let centers = self.store.list_active_centers(None).await?;
                centers
                    .into_iter()
                    .map(|c| c.region)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            }
        };

        let mut forecasts = Vec::with_capacity(regions.len());
        for region in &regions {
            forecasts.push(self.generate_forecast(region, forecast_days).await?);
        }
        info!("✅ Generated {} forecasts", forecasts.len());
        Ok(forecasts)
    }

    /// Newest forecast of each region generated in the last `days`
    pub async fn latest_regional_forecasts(&self, days: i64) -> AppResult<Vec<Forecast>> {
        let since = Utc::now() - Duration::days(days);
        let mut seen = BTreeSet::new();
        Ok(self
            .store
            .forecasts_since(since)
            .await?
            .into_iter()
            .filter(|f| seen.insert(f.region.clone()))
            .collect())
    }

    /// Utilization of each active center over the coming capacity window
    pub async fn capacity_by_center(&self, region: Option<&str>) -> AppResult<Vec<CenterCapacity>> {
        let window_start = Utc::now();
        let days = self.config.capacity_window_days;
        let window_end = window_start + Duration::days(days);

        let centers = self.store.list_active_centers(region).await?;
        let mut capacity = Vec::with_capacity(centers.len());
        for center in centers {
            let current_bookings = self
                .store
                .count_active_bookings_starting(
                    std::slice::from_ref(&center.center_id),
                    window_start,
                    window_end,
                )
                .await?;
            let utilization_percent =
                self.utilization_percent(current_bookings, center.capacity_bays as i64, days);
            let status = if utilization_percent > self.config.center_high_percent {
                CapacityStatus::High
            } else if utilization_percent > self.config.center_medium_percent {
                CapacityStatus::Medium
            } else {
                CapacityStatus::Low
            };
            capacity.push(CenterCapacity {
                center_id: center.center_id,
                name: center.name,
                region: center.region,
                capacity_bays: center.capacity_bays,
                current_bookings,
                utilization_percent,
                status,
            });
        }
        Ok(capacity)
    }

    /// Multiplier adjustment suggested by observed utilization, a fraction
    /// in `[0, 1]`. Only logged.
    pub fn process_feedback(&self, region: &str, utilization: f64, actual_demand: Option<i64>) -> FeedbackOutcome {
        info!(
            "📥 Received feedback for {}: demand={:?}, utilization={}",
            region, actual_demand, utilization
        );
        let adjustment = if utilization > self.config.capacity_threshold_high {
            info!("⬆️ High utilization in {}, raising forecast multiplier", region);
            self.config.multiplier_adjustment
        } else if utilization < self.config.capacity_threshold_low {
            info!("⬇️ Low utilization in {}, lowering forecast multiplier", region);
            -self.config.multiplier_adjustment
        } else {
            0.0
        };
        FeedbackOutcome {
            region: region.to_string(),
            adjustment,
        }
    }
}

fn center_ids(centers: &[ServiceCenter]) -> Vec<String> {
    centers.iter().map(|c| c.center_id.clone()).collect()
}
