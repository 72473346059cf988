//! Booking lifecycle
//!
//! Creation happens inside a caller-owned unit of work that already holds
//! the center's lock. Status changes go through the store's conditional
//! update so two concurrent transitions can never both succeed.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingStatus, BookingTransition, ServiceCenter, SeverityLevel,
};
use crate::repositories::{FleetStore, StoreTx};
use crate::services::slot_allocator::SlotAllocator;
use crate::services::technician_matcher::match_technician;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// What the scheduler decided for one vehicle
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub vehicle_id: String,
    pub slot_start: DateTime<Utc>,
    pub priority_score: f64,
    pub severity_level: SeverityLevel,
    pub service_type: String,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn FleetStore>,
    allocator: SlotAllocator,
}

impl BookingService {
    pub fn new(store: Arc<dyn FleetStore>, allocator: SlotAllocator) -> Self {
        Self { store, allocator }
    }

    /// Persist a provisional booking at `center`.
    ///
    /// The slot is re-checked against the bookings visible to `tx`, so the
    /// capacity bound holds as long as the caller locked the center first.
    /// A missing technician is not an error.
    pub async fn create_in(
        &self,
        tx: &mut dyn StoreTx,
        center: &ServiceCenter,
        draft: BookingDraft,
    ) -> AppResult<Booking> {
        let slot_end = draft.slot_start + self.allocator.slot_duration();

        let existing = tx
            .active_bookings_for_center(&center.center_id, draft.slot_start, slot_end)
            .await?;
        if !self.allocator.has_capacity(center, draft.slot_start, &existing) {
            return Err(AppError::StateConflict(format!(
                "Center {} has no free bay at {}",
                center.center_id, draft.slot_start
            )));
        }

        let technicians = tx.available_technicians(&center.center_id).await?;
        let tech_ids: Vec<String> = technicians.iter().map(|t| t.tech_id.clone()).collect();
        let tech_bookings = tx
            .technician_bookings(&tech_ids, draft.slot_start, slot_end)
            .await?;
        let technician = match_technician(&technicians, &tech_bookings, draft.slot_start, slot_end);
        if technician.is_none() {
            debug!("No technician free at {} for {}", center.center_id, draft.slot_start);
        }

        let booking = Booking {
            booking_id: new_booking_id(),
            vehicle_id: draft.vehicle_id,
            center_id: center.center_id.clone(),
            tech_id: technician.map(|t| t.tech_id.clone()),
            slot_start: draft.slot_start,
            slot_end,
            status: BookingStatus::Provisional,
            priority_score: draft.priority_score,
            severity_level: draft.severity_level,
            service_type: draft.service_type,
            estimated_duration_minutes: self.allocator.slot_duration().num_minutes() as i32,
            notes: None,
            created_at: Utc::now(),
            confirmed_at: None,
            completed_at: None,
        };
        tx.insert_booking(&booking).await?;

        info!(
            "📅 Provisional booking {} for {} at {} ({})",
            booking.booking_id, booking.vehicle_id, booking.center_id, booking.slot_start
        );
        Ok(booking)
    }

    pub async fn get(&self, booking_id: &str) -> AppResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", booking_id))
    }

    pub async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
        self.store.list_bookings(filter).await
    }

    pub async fn confirm(&self, booking_id: &str) -> AppResult<Booking> {
        self.transition(booking_id, BookingTransition::Confirm).await
    }

    pub async fn start(&self, booking_id: &str) -> AppResult<Booking> {
        self.transition(booking_id, BookingTransition::Start).await
    }

    pub async fn complete(&self, booking_id: &str) -> AppResult<Booking> {
        self.transition(booking_id, BookingTransition::Complete).await
    }

    pub async fn cancel(&self, booking_id: &str) -> AppResult<Booking> {
        self.transition(booking_id, BookingTransition::Cancel).await
    }

    async fn transition(&self, booking_id: &str, transition: BookingTransition) -> AppResult<Booking> {
        let booking = self
            .store
            .transition_booking(booking_id, transition, Utc::now())
            .await?;
        info!("✅ Booking {} is now {}", booking.booking_id, booking.status);
        Ok(booking)
    }
}

/// `BKG-` followed by eight uppercase hex digits
fn new_booking_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("BKG-{}", hex[..8].to_uppercase())
}
