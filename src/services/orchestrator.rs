//! Maintenance cycle orchestration
//!
//! Runs forecast, flag collection, scheduling, notification and feedback in
//! strict sequence. Each step is bounded by its own timeout and recorded in
//! the report; a failed step never stops the ones after it and nothing is
//! rolled back or retried.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::OrchestrationConfig;
use crate::models::{Booking, DeliveryStatus, NotificationTemplate};
use crate::services::flag_tracker::FlagTracker;
use crate::services::forecast_service::ForecastService;
use crate::services::notification_service::NotificationService;
use crate::services::scheduling_service::{window_from_today, BatchOutcome, SchedulingService};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ForecastGeneration,
    GetFlaggedVehicles,
    Scheduling,
    Notifications,
    FeedbackProcessing,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

/// One line of the audit trail
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecasts_generated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StepRecord {
    fn new(step: Step, status: StepStatus) -> Self {
        Self {
            step,
            status,
            forecasts_generated: None,
            flagged_count: None,
            scheduled_count: None,
            failed_count: None,
            sent_count: None,
            feedback_count: None,
            error: None,
            reason: None,
        }
    }

    fn success(step: Step) -> Self {
        Self::new(step, StepStatus::Success)
    }

    fn failed(step: Step, error: &AppError) -> Self {
        warn!("❌ Step {:?} failed: {}", step, error);
        Self {
            error: Some(error.to_string()),
            ..Self::new(step, StepStatus::Failed)
        }
    }

    fn skipped(step: Step, reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Self::new(step, StepStatus::Skipped)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
}

impl CycleReport {
    pub fn step(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Run `fut` under `limit`; running out of time is a dependency failure
pub async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::DependencyUnavailable(format!(
            "{} timed out after {:?}",
            what, limit
        ))),
    }
}

#[derive(Clone)]
pub struct OrchestratorService {
    forecasts: ForecastService,
    flags: FlagTracker,
    scheduling: SchedulingService,
    notifications: NotificationService,
    config: OrchestrationConfig,
}

impl OrchestratorService {
    pub fn new(
        forecasts: ForecastService,
        flags: FlagTracker,
        scheduling: SchedulingService,
        notifications: NotificationService,
        config: OrchestrationConfig,
    ) -> Self {
        Self {
            forecasts,
            flags,
            scheduling,
            notifications,
            config,
        }
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    pub async fn run_full_cycle(
        &self,
        forecast_days: i64,
        auto_confirm: bool,
        regions: Option<Vec<String>>,
    ) -> CycleReport {
        let mut steps = Vec::with_capacity(5);

        info!("📊 Step 1: Generating forecasts...");
        steps.push(self.forecast_step(regions, forecast_days).await);

        info!("🚩 Step 2: Getting flagged vehicles...");
        let (record, vehicle_ids) = self.flagged_step().await;
        steps.push(record);

        info!("📅 Step 3: Scheduling appointments...");
        let (record, new_bookings) = self.scheduling_step(&vehicle_ids, forecast_days).await;
        steps.push(record);

        if auto_confirm {
            info!("📧 Step 4: Sending notifications...");
            steps.push(self.notification_step(&new_bookings).await);
        } else {
            steps.push(StepRecord::skipped(Step::Notifications, "Auto-confirm not requested"));
        }

        info!("🔄 Step 5: Processing feedback...");
        steps.push(self.feedback_step().await);

        CycleReport {
            timestamp: Utc::now(),
            steps,
        }
    }

    /// Book every vehicle that has an open flag over the default window
    pub async fn schedule_flagged(&self) -> AppResult<BatchOutcome> {
        let vehicle_ids = self.flagged_vehicle_ids().await?;
        if vehicle_ids.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let (start, end) = window_from_today(self.config.schedule_flagged_days);
        with_timeout(
            self.config.scheduling_timeout,
            "scheduling",
            self.scheduling.schedule_batch(&vehicle_ids, start, end),
        )
        .await
    }

    async fn forecast_step(&self, regions: Option<Vec<String>>, forecast_days: i64) -> StepRecord {
        let result = with_timeout(
            self.config.forecast_timeout,
            "forecast generation",
            self.forecasts.generate_forecasts(regions, forecast_days),
        )
        .await;
        match result {
            Ok(forecasts) => StepRecord {
                forecasts_generated: Some(forecasts.len()),
                ..StepRecord::success(Step::ForecastGeneration)
            },
            Err(e) => StepRecord::failed(Step::ForecastGeneration, &e),
        }
    }

    async fn flagged_step(&self) -> (StepRecord, Vec<String>) {
        match self.flagged_vehicle_ids().await {
            Ok(ids) => {
                info!("✅ Found {} flagged vehicles", ids.len());
                let record = StepRecord {
                    flagged_count: Some(ids.len()),
                    ..StepRecord::success(Step::GetFlaggedVehicles)
                };
                (record, ids)
            }
            Err(e) => (StepRecord::failed(Step::GetFlaggedVehicles, &e), Vec::new()),
        }
    }

    async fn scheduling_step(&self, vehicle_ids: &[String], forecast_days: i64) -> (StepRecord, Vec<Booking>) {
        if vehicle_ids.is_empty() {
            return (
                StepRecord::skipped(Step::Scheduling, "No vehicles to schedule"),
                Vec::new(),
            );
        }
        let (start, end) = window_from_today(forecast_days);
        let result = with_timeout(
            self.config.scheduling_timeout,
            "scheduling",
            self.scheduling.schedule_batch(vehicle_ids, start, end),
        )
        .await;
        match result {
            Ok(outcome) => {
                info!("✅ Scheduled {} appointments", outcome.scheduled_count());
                let record = StepRecord {
                    scheduled_count: Some(outcome.scheduled_count()),
                    failed_count: Some(outcome.failed_count()),
                    ..StepRecord::success(Step::Scheduling)
                };
                (record, outcome.bookings)
            }
            Err(e) => (StepRecord::failed(Step::Scheduling, &e), Vec::new()),
        }
    }

    async fn notification_step(&self, bookings: &[Booking]) -> StepRecord {
        if bookings.is_empty() {
            return StepRecord::skipped(Step::Notifications, "No new bookings to confirm");
        }
        let mut sent = 0;
        for booking in bookings {
            if let Err(e) = self.scheduling.bookings().confirm(&booking.booking_id).await {
                warn!("Could not confirm {}: {}", booking.booking_id, e);
                continue;
            }
            match self
                .notifications
                .send(&booking.booking_id, NotificationTemplate::BookingConfirmation)
                .await
            {
                Ok(n) if n.status == DeliveryStatus::Sent.as_str() => sent += 1,
                Ok(_) => {}
                Err(e) => warn!("Could not notify for {}: {}", booking.booking_id, e),
            }
        }
        info!("✅ Sent {} notifications", sent);
        StepRecord {
            sent_count: Some(sent),
            ..StepRecord::success(Step::Notifications)
        }
    }

    async fn feedback_step(&self) -> StepRecord {
        let capacity = with_timeout(
            self.config.capacity_timeout,
            "capacity check",
            self.forecasts.capacity_by_center(None),
        )
        .await;
        let capacity = match capacity {
            Ok(capacity) => capacity,
            Err(e) => return StepRecord::failed(Step::FeedbackProcessing, &e),
        };

        let mut feedback = 0;
        for center in capacity
            .iter()
            .filter(|c| c.utilization_percent > self.config.feedback_utilization_percent)
        {
            let result = with_timeout(self.config.feedback_timeout, "feedback", async {
                Ok(self.forecasts.process_feedback(
                    &center.region,
                    center.utilization_percent / 100.0,
                    Some(center.current_bookings),
                ))
            })
            .await;
            match result {
                Ok(_) => feedback += 1,
                Err(e) => return StepRecord::failed(Step::FeedbackProcessing, &e),
            }
        }
        info!("✅ Feedback processed");
        StepRecord {
            feedback_count: Some(feedback),
            ..StepRecord::success(Step::FeedbackProcessing)
        }
    }

    /// Vehicles with an open flag, oldest flag first, each listed once
    async fn flagged_vehicle_ids(&self) -> AppResult<Vec<String>> {
        let flags = self.flags.unresolved().await?;
        let mut seen = BTreeSet::new();
        Ok(flags
            .into_iter()
            .map(|f| f.vehicle_id)
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LoggingDispatcher;
    use crate::config::{ForecastConfig, SchedulingConfig};
    use crate::database::seed::{sample_booking, sample_center, sample_vehicle};
    use crate::models::{BookingFilter, BookingStatus, NewTelemetrySample};
    use crate::repositories::{FleetStore, MemoryStore};
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn orchestrator(store: &MemoryStore) -> OrchestratorService {
        let shared: Arc<dyn FleetStore> = Arc::new(store.clone());
        let forecast_config = ForecastConfig::default();
        OrchestratorService::new(
            ForecastService::new(shared.clone(), forecast_config.clone()),
            FlagTracker::new(shared.clone(), &forecast_config),
            SchedulingService::new(shared.clone(), SchedulingConfig::default()),
            NotificationService::new(shared, Arc::new(LoggingDispatcher)),
            OrchestrationConfig::default(),
        )
    }

    async fn flag_vehicle(orchestrator: &OrchestratorService, vehicle_id: &str) {
        orchestrator
            .flags
            .ingest(NewTelemetrySample {
                vehicle_id: vehicle_id.to_string(),
                oil_quality: Some(2.5),
                brake_condition: Some("Poor".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 3));
        store.add_center(sample_center("SC-2", "South", 2));
        for id in ["V001", "V002", "V003"] {
            store.add_vehicle(sample_vehicle(id, "premium"));
        }
        store
    }

    #[tokio::test]
    async fn test_full_cycle_with_auto_confirm() {
        let store = store();
        let orchestrator = orchestrator(&store);
        flag_vehicle(&orchestrator, "V001").await;
        flag_vehicle(&orchestrator, "V002").await;

        let report = orchestrator.run_full_cycle(7, true, None).await;
        let order: Vec<Step> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(
            order,
            vec![
                Step::ForecastGeneration,
                Step::GetFlaggedVehicles,
                Step::Scheduling,
                Step::Notifications,
                Step::FeedbackProcessing
            ]
        );
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Success));
        assert_eq!(report.step(Step::ForecastGeneration).unwrap().forecasts_generated, Some(2));
        assert_eq!(report.step(Step::GetFlaggedVehicles).unwrap().flagged_count, Some(2));
        assert_eq!(report.step(Step::Scheduling).unwrap().scheduled_count, Some(2));
        assert_eq!(report.step(Step::Notifications).unwrap().sent_count, Some(2));

        let confirmed = store
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 2);
        assert_eq!(store.list_notifications(None, 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_flagged_skips_scheduling() {
        let store = store();
        let report = orchestrator(&store).run_full_cycle(7, false, None).await;

        let scheduling = report.step(Step::Scheduling).unwrap();
        assert_eq!(scheduling.status, StepStatus::Skipped);
        assert_eq!(scheduling.reason.as_deref(), Some("No vehicles to schedule"));
        assert_eq!(report.step(Step::Notifications).unwrap().status, StepStatus::Skipped);
        assert_eq!(report.step(Step::FeedbackProcessing).unwrap().status, StepStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_the_cycle() {
        let store = store();
        let orchestrator = orchestrator(&store);
        flag_vehicle(&orchestrator, "V001").await;

        // forecast_days = 0 is rejected by the forecast engine only
        let report = orchestrator.run_full_cycle(0, false, None).await;
        let forecast = report.step(Step::ForecastGeneration).unwrap();
        assert_eq!(forecast.status, StepStatus::Failed);
        assert!(forecast.error.is_some());
        assert_eq!(report.step(Step::GetFlaggedVehicles).unwrap().flagged_count, Some(1));
        assert_eq!(report.steps.len(), 5);
    }

    #[tokio::test]
    async fn test_busy_center_triggers_feedback() {
        let store = store();
        let start = Utc::now() + ChronoDuration::hours(1);
        for n in 0..120 {
            store.add_booking(sample_booking(
                &format!("BKG-B{:03}", n),
                "SC-2",
                start + ChronoDuration::hours(n),
                BookingStatus::Confirmed,
            ));
        }
        let report = orchestrator(&store).run_full_cycle(7, false, None).await;
        let feedback = report.step(Step::FeedbackProcessing).unwrap();
        // 120 of 140 bay-hours at SC-2 over the capacity window
        assert_eq!(feedback.feedback_count, Some(1));
    }

    #[tokio::test]
    async fn test_schedule_flagged() {
        let store = store();
        let orchestrator = orchestrator(&store);
        assert_eq!(orchestrator.schedule_flagged().await.unwrap().scheduled_count(), 0);

        flag_vehicle(&orchestrator, "V003").await;
        let outcome = orchestrator.schedule_flagged().await.unwrap();
        assert_eq!(outcome.scheduled_count(), 1);
        assert_eq!(outcome.bookings[0].vehicle_id, "V003");
    }

    #[tokio::test]
    async fn test_timeout_becomes_dependency_failure() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, AppError>(())
        };
        let err = with_timeout(Duration::from_millis(10), "forecast generation", slow)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DependencyUnavailable(_)));
        assert!(err.to_string().contains("forecast generation timed out"));
    }
}
