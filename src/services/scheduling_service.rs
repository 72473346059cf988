//! Batch scheduling
//!
//! Every vehicle in a batch is booked into the first open slot of the first
//! center (in trial order) that has one. The whole batch runs in one unit of
//! work holding every active center's lock, so slot discovery and the insert
//! cannot interleave with another batch. Per-vehicle problems are reported
//! and skipped; a store failure rolls the whole batch back.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SchedulingConfig;
use crate::models::{Booking, ServiceCenter};
use crate::repositories::{FleetStore, StoreTx};
use crate::services::booking_service::{BookingDraft, BookingService};
use crate::services::priority_scorer::PriorityScorer;
use crate::services::slot_allocator::SlotAllocator;
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::validation::start_of_day;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedVehicle {
    pub vehicle_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub bookings: Vec<Booking>,
    pub failed_vehicles: Vec<FailedVehicle>,
}

impl BatchOutcome {
    pub fn scheduled_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_vehicles.len()
    }
}

enum VehicleOutcome {
    Scheduled(Booking),
    Failed(String),
}

/// Longest window a batch may search
pub const MAX_WINDOW_DAYS: i64 = 365;

/// Rejects reversed windows and windows longer than [`MAX_WINDOW_DAYS`]
pub fn check_window(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> AppResult<()> {
    if window_end < window_start {
        return Err(validation_error("End date must not be before start date"));
    }
    if window_end - window_start > Duration::days(MAX_WINDOW_DAYS) {
        return Err(validation_error(format!(
            "Date range cannot exceed {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(())
}

/// `[today 00:00, today + days 00:00)` in UTC
pub fn window_from_today(days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(Utc::now().date_naive());
    (start, start + Duration::days(days))
}

#[derive(Clone)]
pub struct SchedulingService {
    store: Arc<dyn FleetStore>,
    config: SchedulingConfig,
    scorer: PriorityScorer,
    allocator: SlotAllocator,
    bookings: BookingService,
}

impl SchedulingService {
    pub fn new(store: Arc<dyn FleetStore>, config: SchedulingConfig) -> Self {
        let allocator = SlotAllocator::new(config.slot_duration());
        Self {
            bookings: BookingService::new(store.clone(), allocator),
            scorer: PriorityScorer::new(config.clone()),
            store,
            config,
            allocator,
        }
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    /// Open slot starts at a center for one UTC calendar day. Unknown or
    /// inactive centers have no slots.
    pub async fn slots_for_day(&self, center_id: &str, day_start: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
        let center = self.store.get_center(center_id).await?.filter(|c| c.is_active);
        let Some(center) = center else {
            warn!("Slots requested for unknown or inactive center {}", center_id);
            return Ok(Vec::new());
        };
        let day_end = day_start + Duration::days(1);
        let existing = self
            .store
            .active_bookings_for_center(center_id, day_start, day_end + self.allocator.slot_duration())
            .await?;
        Ok(self.allocator.available_slots(&center, day_start, day_end, &existing))
    }

    pub async fn schedule_batch(
        &self,
        vehicle_ids: &[String],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> AppResult<BatchOutcome> {
        if vehicle_ids.is_empty() {
            return Err(validation_error("No vehicles provided"));
        }
        check_window(window_start, window_end)?;

        let centers = self.store.list_active_centers(None).await?;
        let mut tx = self.store.begin().await?;
        let mut center_ids: Vec<String> = centers.iter().map(|c| c.center_id.clone()).collect();
        center_ids.sort();
        tx.lock_centers(&center_ids).await?;

        let mut outcome = BatchOutcome::default();
        for vehicle_id in vehicle_ids {
            let result = self
                .schedule_vehicle(tx.as_mut(), vehicle_id, &centers, window_start, window_end)
                .await;
            match result {
                Ok(VehicleOutcome::Scheduled(booking)) => outcome.bookings.push(booking),
                Ok(VehicleOutcome::Failed(reason)) => outcome.failed_vehicles.push(FailedVehicle {
                    vehicle_id: vehicle_id.clone(),
                    reason,
                }),
                Err(e) if e.is_store_failure() => return Err(e),
                Err(e) => {
                    warn!("❌ Error scheduling vehicle {}: {}", vehicle_id, e);
                    outcome.failed_vehicles.push(FailedVehicle {
                        vehicle_id: vehicle_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tx.commit().await?;
        info!(
            "✅ Batch scheduled {} vehicles, {} failed",
            outcome.scheduled_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }

    async fn schedule_vehicle(
        &self,
        tx: &mut dyn StoreTx,
        vehicle_id: &str,
        centers: &[ServiceCenter],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> AppResult<VehicleOutcome> {
        let Some(vehicle) = tx.get_vehicle(vehicle_id).await? else {
            return Ok(VehicleOutcome::Failed("Vehicle not found".to_string()));
        };
        let Some(flag) = tx.latest_unresolved_flag(vehicle_id).await? else {
            return Ok(VehicleOutcome::Failed("No maintenance flag found".to_string()));
        };
        if centers.is_empty() {
            return Ok(VehicleOutcome::Failed("No active service centers found in database".to_string()));
        }

        let days_waiting = (Utc::now() - flag.flagged_at).num_days().max(0);
        let order = self.trial_order(centers);

        for center in order {
            let existing = tx
                .active_bookings_for_center(
                    &center.center_id,
                    window_start,
                    window_end + self.allocator.slot_duration(),
                )
                .await?;
            let Some(slot_start) = self
                .allocator
                .first_available_slot(center, window_start, window_end, &existing)
            else {
                continue;
            };

            let draft = BookingDraft {
                vehicle_id: vehicle.vehicle_id.clone(),
                slot_start,
                priority_score: self.scorer.score(&vehicle, Some(&flag), days_waiting),
                severity_level: self.scorer.severity_level(flag.severity_score),
                service_type: self.config.default_service_type.clone(),
            };
            let booking = self.bookings.create_in(tx, center, draft).await?;
            tx.mark_flag_scheduled(flag.flag_id, &booking.booking_id).await?;
            return Ok(VehicleOutcome::Scheduled(booking));
        }

        Ok(VehicleOutcome::Failed("No available slots".to_string()))
    }

    /// Centers in the order a vehicle tries them
    fn trial_order<'a>(&self, centers: &'a [ServiceCenter]) -> Vec<&'a ServiceCenter> {
        let mut order: Vec<&ServiceCenter> = centers.iter().collect();
        if self.config.shuffle_centers {
            order.shuffle(&mut rand::thread_rng());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::seed::{sample_booking, sample_center, sample_technician, sample_vehicle};
    use crate::models::{BookingStatus, NewMaintenanceFlag, SeverityLevel};
    use crate::repositories::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, d, 0, 0, 0).unwrap()
    }

    fn unshuffled() -> SchedulingConfig {
        SchedulingConfig {
            shuffle_centers: false,
            ..SchedulingConfig::default()
        }
    }

    async fn flag(store: &MemoryStore, vehicle_id: &str, severity: f64) {
        store
            .insert_flag_if_absent(NewMaintenanceFlag {
                vehicle_id: vehicle_id.to_string(),
                flagged_at: Utc::now() - Duration::days(2),
                confidence: 0.9,
                risk_factors: vec!["Low battery".to_string()],
                severity_score: severity,
            })
            .await
            .unwrap();
    }

    async fn fleet(store: &MemoryStore, count: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for n in 1..=count {
            let id = format!("V{:03}", n);
            store.add_vehicle(sample_vehicle(&id, "fleet"));
            flag(store, &id, 80.0).await;
            ids.push(id);
        }
        ids
    }

    fn service(store: &MemoryStore, config: SchedulingConfig) -> SchedulingService {
        SchedulingService::new(Arc::new(store.clone()), config)
    }

    #[tokio::test]
    async fn test_books_first_open_slot_and_marks_flag() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 1));
        store.add_technician(sample_technician("T001", "SC-1"));
        let ids = fleet(&store, 1).await;

        let outcome = service(&store, unshuffled())
            .schedule_batch(&ids, day(4), day(5))
            .await
            .unwrap();

        assert_eq!(outcome.scheduled_count(), 1);
        let booking = &outcome.bookings[0];
        assert_eq!(booking.slot_start, day(4) + Duration::hours(8));
        assert_eq!(booking.status, BookingStatus::Provisional);
        assert_eq!(booking.priority_score, 55.25);
        assert_eq!(booking.severity_level, SeverityLevel::Critical);
        assert_eq!(booking.tech_id.as_deref(), Some("T001"));
        assert!(store.list_unresolved_flags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_per_vehicle_failures_do_not_abort_batch() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 2));
        let mut ids = fleet(&store, 1).await;
        store.add_vehicle(sample_vehicle("V100", "standard"));
        ids.push("V100".to_string());
        ids.push("V404".to_string());

        let outcome = service(&store, unshuffled())
            .schedule_batch(&ids, day(4), day(5))
            .await
            .unwrap();

        assert_eq!(outcome.scheduled_count(), 1);
        assert_eq!(
            outcome.failed_vehicles,
            vec![
                FailedVehicle {
                    vehicle_id: "V100".to_string(),
                    reason: "No maintenance flag found".to_string()
                },
                FailedVehicle {
                    vehicle_id: "V404".to_string(),
                    reason: "Vehicle not found".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_vehicle_listed_twice_is_booked_once() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 2));
        let ids = fleet(&store, 1).await;
        let twice = vec![ids[0].clone(), ids[0].clone()];

        let outcome = service(&store, unshuffled())
            .schedule_batch(&twice, day(4), day(5))
            .await
            .unwrap();
        assert_eq!(outcome.scheduled_count(), 1);
        assert_eq!(outcome.failed_vehicles[0].reason, "No maintenance flag found");
    }

    #[tokio::test]
    async fn test_missing_centers_and_full_windows() {
        let store = MemoryStore::new();
        let ids = fleet(&store, 1).await;
        let outcome = service(&store, unshuffled())
            .schedule_batch(&ids, day(4), day(5))
            .await
            .unwrap();
        assert_eq!(outcome.failed_vehicles[0].reason, "No active service centers found in database");

        store.add_center(sample_center("SC-1", "North", 1));
        let outcome = service(&store, unshuffled())
            .schedule_batch(&ids, day(4), day(4))
            .await
            .unwrap();
        assert_eq!(outcome.failed_vehicles[0].reason, "No available slots");
        assert_eq!(store.list_unresolved_flags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let store = MemoryStore::new();
        assert!(service(&store, unshuffled())
            .schedule_batch(&[], day(4), day(5))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_falls_through_to_next_center() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 1));
        store.add_center(sample_center("SC-2", "South", 1));
        for hour in 8..18 {
            store.add_booking(sample_booking(
                &format!("BKG-F{}", hour),
                "SC-1",
                day(4) + Duration::hours(hour),
                BookingStatus::Confirmed,
            ));
        }
        let ids = fleet(&store, 1).await;

        let outcome = service(&store, unshuffled())
            .schedule_batch(&ids, day(4), day(5))
            .await
            .unwrap();
        assert_eq!(outcome.bookings[0].center_id, "SC-2");
    }

    #[tokio::test]
    async fn test_concurrent_batches_never_overbook() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 2));
        store.add_center(sample_center("SC-2", "South", 1));
        let ids = fleet(&store, 40).await;
        let service = service(&store, SchedulingConfig::default());

        let batches = ids.chunks(10).map(|chunk| {
            let service = service.clone();
            let chunk = chunk.to_vec();
            tokio::spawn(async move { service.schedule_batch(&chunk, day(4), day(5)).await })
        });
        let mut scheduled = 0;
        for handle in futures::future::join_all(batches).await {
            scheduled += handle.unwrap().unwrap().scheduled_count();
        }
        // 10 hours x (2 + 1) bays
        assert_eq!(scheduled, 30);

        for (center, bays) in [("SC-1", 2), ("SC-2", 1)] {
            let booked = store.active_bookings_for_center(center, day(4), day(5)).await.unwrap();
            for hour in 8..18 {
                let at = day(4) + Duration::hours(hour);
                assert!(booked.iter().filter(|b| b.covers(at)).count() <= bays);
            }
        }
    }

    #[tokio::test]
    async fn test_slots_for_day() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 1));
        store.add_booking(sample_booking(
            "BKG-1",
            "SC-1",
            day(4) + Duration::hours(9),
            BookingStatus::Confirmed,
        ));
        let service = service(&store, unshuffled());

        let slots = service.slots_for_day("SC-1", day(4)).await.unwrap();
        assert_eq!(slots.len(), 9);
        assert!(!slots.contains(&(day(4) + Duration::hours(9))));
        assert!(slots.contains(&(day(4) + Duration::hours(10))));
        assert!(service.slots_for_day("SC-404", day(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_center_has_no_slots() {
        let store = MemoryStore::new();
        let mut center = sample_center("SC-9", "North", 2);
        center.is_active = false;
        store.add_center(center);

        let slots = service(&store, unshuffled()).slots_for_day("SC-9", day(4)).await.unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_reversed_or_oversized_windows_are_rejected() {
        let store = MemoryStore::new();
        store.add_center(sample_center("SC-1", "North", 1));
        let ids = fleet(&store, 1).await;
        let service = service(&store, unshuffled());

        let reversed = service.schedule_batch(&ids, day(5), day(4)).await.unwrap_err();
        assert_eq!(reversed.code(), "VALIDATION_ERROR");

        let huge = service
            .schedule_batch(&ids, day(4), day(4) + Duration::days(MAX_WINDOW_DAYS + 1))
            .await
            .unwrap_err();
        assert_eq!(huge.code(), "VALIDATION_ERROR");
        assert_eq!(store.list_unresolved_flags().await.unwrap().len(), 1);

        let widest = service
            .schedule_batch(&ids, day(4), day(4) + Duration::days(MAX_WINDOW_DAYS))
            .await
            .unwrap();
        assert_eq!(widest.scheduled_count(), 1);
    }
}
