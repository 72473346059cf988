//! In-memory `FleetStore`
//!
//! Tables live behind one `RwLock` that is never held across an await.
//! Units of work are serialized on a separate async mutex and buffer their
//! writes until commit, so reads inside a unit of work see its own pending
//! bookings and flag updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    Booking, BookingFilter, BookingStatus, BookingTransition, Forecast, MaintenanceFlag,
    NewForecast, NewMaintenanceFlag, NewNotification, NewTelemetrySample, Notification,
    ServiceCenter, TelemetrySample, Technician, Vehicle,
};
use crate::repositories::{FleetStore, StoreTx};
use crate::utils::errors::{invalid_transition_error, not_found_error, AppResult};

#[derive(Default)]
struct Tables {
    vehicles: BTreeMap<String, Vehicle>,
    centers: BTreeMap<String, ServiceCenter>,
    technicians: BTreeMap<String, Technician>,
    bookings: BTreeMap<String, Booking>,
    telemetry: Vec<TelemetrySample>,
    flags: Vec<MaintenanceFlag>,
    forecasts: Vec<Forecast>,
    notifications: Vec<Notification>,
    next_telemetry_id: i64,
    next_flag_id: i64,
    next_forecast_id: i64,
    next_notification_id: i64,
}

impl Tables {
    fn active_bookings_for_center(
        &self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .values()
            .filter(|b| b.center_id == center_id && b.status.occupies_bay() && b.overlaps(from, to))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.slot_start);
        bookings
    }

    fn technician_bookings(
        &self,
        tech_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Booking> {
        self.bookings
            .values()
            .filter(|b| is_technician_booking(b, tech_ids, from, to))
            .cloned()
            .collect()
    }

    fn available_technicians(&self, center_id: &str) -> Vec<Technician> {
        // BTreeMap iteration is already ordered by tech_id
        self.technicians
            .values()
            .filter(|t| t.center_id == center_id && t.is_available)
            .cloned()
            .collect()
    }
}

fn is_technician_booking(
    booking: &Booking,
    tech_ids: &[String],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> bool {
    booking
        .tech_id
        .as_ref()
        .map_or(false, |tech| tech_ids.contains(tech))
        && BookingStatus::TECHNICIAN_BUSY.contains(&booking.status)
        && booking.overlaps(from, to)
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    unit_of_work: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        self.write().vehicles.insert(vehicle.vehicle_id.clone(), vehicle);
    }

    pub fn add_center(&self, center: ServiceCenter) {
        self.write().centers.insert(center.center_id.clone(), center);
    }

    pub fn add_technician(&self, technician: Technician) {
        self.write()
            .technicians
            .insert(technician.tech_id.clone(), technician);
    }

    /// Insert a booking as-is, bypassing capacity checks
    pub fn add_booking(&self, booking: Booking) {
        self.write().bookings.insert(booking.booking_id.clone(), booking);
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.unit_of_work.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            tables: self.tables.clone(),
            _guard: guard,
            pending_bookings: Vec::new(),
            scheduled_flags: Vec::new(),
        }))
    }

    async fn get_vehicle(&self, vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        Ok(self.read().vehicles.get(vehicle_id).cloned())
    }

    async fn list_vehicles(&self, limit: i64) -> AppResult<Vec<Vehicle>> {
        Ok(self
            .read()
            .vehicles
            .values()
            .take(clamp_limit(limit))
            .cloned()
            .collect())
    }

    async fn get_center(&self, center_id: &str) -> AppResult<Option<ServiceCenter>> {
        Ok(self.read().centers.get(center_id).cloned())
    }

    async fn list_active_centers(&self, region: Option<&str>) -> AppResult<Vec<ServiceCenter>> {
        Ok(self
            .read()
            .centers
            .values()
            .filter(|c| c.is_active && region.map_or(true, |r| c.region == r))
            .cloned()
            .collect())
    }

    async fn get_technician(&self, tech_id: &str) -> AppResult<Option<Technician>> {
        Ok(self.read().technicians.get(tech_id).cloned())
    }

    async fn active_bookings_for_center(
        &self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        Ok(self.read().active_bookings_for_center(center_id, from, to))
    }

    async fn get_booking(&self, booking_id: &str) -> AppResult<Option<Booking>> {
        Ok(self.read().bookings.get(booking_id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
        let tables = self.read();
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.center_id.as_deref().map_or(true, |c| b.center_id == c))
            .filter(|b| filter.vehicle_id.as_deref().map_or(true, |v| b.vehicle_id == v))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.slot_start.cmp(&a.slot_start));
        bookings.truncate(clamp_limit(filter.limit.unwrap_or(100)));
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        booking_id: &str,
        transition: BookingTransition,
        at: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let mut tables = self.write();
        let booking = tables
            .bookings
            .get_mut(booking_id)
            .ok_or_else(|| not_found_error("Booking", booking_id))?;
        if !transition.is_allowed_from(booking.status) {
            return Err(invalid_transition_error(
                "booking",
                booking_id,
                booking.status.as_str(),
                transition.verb(),
            ));
        }
        booking.apply(transition, at);
        Ok(booking.clone())
    }

    async fn booking_created_times(
        &self,
        center_ids: &[String],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        Ok(self
            .read()
            .bookings
            .values()
            .filter(|b| center_ids.contains(&b.center_id) && b.created_at >= since)
            .map(|b| b.created_at)
            .collect())
    }

    async fn count_active_bookings_starting(
        &self,
        center_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count = self
            .read()
            .bookings
            .values()
            .filter(|b| {
                center_ids.contains(&b.center_id)
                    && b.status.occupies_bay()
                    && b.slot_start >= start
                    && b.slot_start < end
            })
            .count();
        Ok(count as i64)
    }

    async fn insert_telemetry(&self, sample: NewTelemetrySample) -> AppResult<TelemetrySample> {
        let mut tables = self.write();
        tables.next_telemetry_id += 1;
        let stored = TelemetrySample {
            id: tables.next_telemetry_id,
            vehicle_id: sample.vehicle_id,
            timestamp: sample.timestamp.unwrap_or_else(Utc::now),
            mileage: sample.mileage,
            engine_load: sample.engine_load,
            oil_quality: sample.oil_quality,
            battery_percent: sample.battery_percent,
            brake_condition: sample.brake_condition,
            brake_temp: sample.brake_temp,
            tire_pressure: sample.tire_pressure,
            fuel_consumption: sample.fuel_consumption,
        };
        tables.telemetry.push(stored.clone());
        Ok(stored)
    }

    async fn list_telemetry(
        &self,
        vehicle_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<TelemetrySample>> {
        let tables = self.read();
        let mut samples: Vec<TelemetrySample> = tables
            .telemetry
            .iter()
            .filter(|t| vehicle_id.map_or(true, |v| t.vehicle_id == v))
            .cloned()
            .collect();
        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        samples.truncate(clamp_limit(limit));
        Ok(samples)
    }

    async fn latest_telemetry_per_vehicle(
        &self,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<TelemetrySample>> {
        let tables = self.read();
        let mut latest: BTreeMap<&str, &TelemetrySample> = BTreeMap::new();
        for sample in tables.telemetry.iter().filter(|t| t.timestamp >= since) {
            let newer = latest
                .get(sample.vehicle_id.as_str())
                .map_or(true, |current| {
                    (sample.timestamp, sample.id) > (current.timestamp, current.id)
                });
            if newer {
                latest.insert(sample.vehicle_id.as_str(), sample);
            }
        }
        Ok(latest.into_values().cloned().collect())
    }

    async fn count_telemetry(&self) -> AppResult<i64> {
        Ok(self.read().telemetry.len() as i64)
    }

    async fn insert_flag_if_absent(
        &self,
        flag: NewMaintenanceFlag,
    ) -> AppResult<Option<MaintenanceFlag>> {
        let mut tables = self.write();
        let already_open = tables
            .flags
            .iter()
            .any(|f| f.vehicle_id == flag.vehicle_id && f.is_unresolved());
        if already_open {
            return Ok(None);
        }
        tables.next_flag_id += 1;
        let stored = MaintenanceFlag {
            flag_id: tables.next_flag_id,
            vehicle_id: flag.vehicle_id,
            flagged_at: flag.flagged_at,
            maintenance_required: true,
            confidence: flag.confidence,
            risk_factors: flag.risk_factors,
            severity_score: flag.severity_score,
            is_scheduled: false,
            scheduled_booking_id: None,
            resolved_at: None,
        };
        tables.flags.push(stored.clone());
        Ok(Some(stored))
    }

    async fn list_unresolved_flags(&self) -> AppResult<Vec<MaintenanceFlag>> {
        let tables = self.read();
        let mut flags: Vec<MaintenanceFlag> =
            tables.flags.iter().filter(|f| f.is_unresolved()).cloned().collect();
        flags.sort_by_key(|f| (f.flagged_at, f.flag_id));
        Ok(flags)
    }

    async fn resolve_flag(&self, flag_id: i64, booking_id: &str) -> AppResult<MaintenanceFlag> {
        let mut tables = self.write();
        let flag = tables
            .flags
            .iter_mut()
            .find(|f| f.flag_id == flag_id)
            .ok_or_else(|| not_found_error("Maintenance flag", &flag_id.to_string()))?;
        flag.is_scheduled = true;
        flag.scheduled_booking_id = Some(booking_id.to_string());
        Ok(flag.clone())
    }

    async fn insert_forecast(&self, forecast: NewForecast) -> AppResult<Forecast> {
        let mut tables = self.write();
        tables.next_forecast_id += 1;
        let stored = Forecast {
            forecast_id: tables.next_forecast_id,
            region: forecast.region,
            window_start: forecast.window_start,
            window_end: forecast.window_end,
            estimated_requests: forecast.estimated_requests,
            confidence_level: forecast.confidence_level,
            capacity_utilization: forecast.capacity_utilization,
            generated_at: forecast.generated_at,
        };
        tables.forecasts.push(stored.clone());
        Ok(stored)
    }

    async fn forecasts_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Forecast>> {
        let tables = self.read();
        let mut forecasts: Vec<Forecast> = tables
            .forecasts
            .iter()
            .filter(|f| f.generated_at >= since)
            .cloned()
            .collect();
        forecasts.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then(b.forecast_id.cmp(&a.forecast_id))
        });
        Ok(forecasts)
    }

    async fn insert_notification(&self, notification: NewNotification) -> AppResult<Notification> {
        let mut tables = self.write();
        if !tables.bookings.contains_key(&notification.booking_id) {
            return Err(not_found_error("Booking", &notification.booking_id));
        }
        tables.next_notification_id += 1;
        let stored = Notification {
            notification_id: tables.next_notification_id,
            booking_id: notification.booking_id,
            recipient_name: notification.recipient_name,
            recipient_contact: notification.recipient_contact,
            recipient_email: notification.recipient_email,
            channel: notification.channel,
            template: notification.template.as_str().to_string(),
            message_content: notification.message_content,
            status: notification.status.as_str().to_string(),
            sent_at: notification.sent_at,
        };
        tables.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn list_notifications(
        &self,
        booking_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let tables = self.read();
        let mut notifications: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| booking_id.map_or(true, |b| n.booking_id == b))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| {
            b.sent_at
                .cmp(&a.sent_at)
                .then(b.notification_id.cmp(&a.notification_id))
        });
        notifications.truncate(clamp_limit(limit));
        Ok(notifications)
    }
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}

/// Unit of work over the in-memory tables
pub struct MemoryTx {
    tables: Arc<RwLock<Tables>>,
    _guard: OwnedMutexGuard<()>,
    pending_bookings: Vec<Booking>,
    scheduled_flags: Vec<(i64, String)>,
}

impl MemoryTx {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_pending_scheduled(&self, flag_id: i64) -> bool {
        self.scheduled_flags.iter().any(|(id, _)| *id == flag_id)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_centers(&mut self, _center_ids: &[String]) -> AppResult<()> {
        // The unit-of-work mutex already covers every center
        Ok(())
    }

    async fn get_vehicle(&mut self, vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        Ok(self.read().vehicles.get(vehicle_id).cloned())
    }

    async fn active_bookings_for_center(
        &mut self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let mut bookings = self.read().active_bookings_for_center(center_id, from, to);
        bookings.extend(
            self.pending_bookings
                .iter()
                .filter(|b| b.center_id == center_id && b.status.occupies_bay() && b.overlaps(from, to))
                .cloned(),
        );
        bookings.sort_by_key(|b| b.slot_start);
        Ok(bookings)
    }

    async fn available_technicians(&mut self, center_id: &str) -> AppResult<Vec<Technician>> {
        Ok(self.read().available_technicians(center_id))
    }

    async fn technician_bookings(
        &mut self,
        tech_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let mut bookings = self.read().technician_bookings(tech_ids, from, to);
        bookings.extend(
            self.pending_bookings
                .iter()
                .filter(|b| is_technician_booking(b, tech_ids, from, to))
                .cloned(),
        );
        Ok(bookings)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()> {
        self.pending_bookings.push(booking.clone());
        Ok(())
    }

    async fn latest_unresolved_flag(
        &mut self,
        vehicle_id: &str,
    ) -> AppResult<Option<MaintenanceFlag>> {
        let tables = self.read();
        let flag = tables
            .flags
            .iter()
            .filter(|f| {
                f.vehicle_id == vehicle_id && f.is_unresolved() && !self.is_pending_scheduled(f.flag_id)
            })
            .max_by_key(|f| (f.flagged_at, f.flag_id))
            .cloned();
        Ok(flag)
    }

    async fn mark_flag_scheduled(&mut self, flag_id: i64, booking_id: &str) -> AppResult<()> {
        let exists = self.read().flags.iter().any(|f| f.flag_id == flag_id);
        if !exists {
            return Err(not_found_error("Maintenance flag", &flag_id.to_string()));
        }
        self.scheduled_flags.push((flag_id, booking_id.to_string()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            tables: shared,
            _guard,
            pending_bookings,
            scheduled_flags,
        } = *self;
        let mut tables = shared.write().unwrap_or_else(PoisonError::into_inner);
        for booking in pending_bookings {
            tables.bookings.insert(booking.booking_id.clone(), booking);
        }
        for (flag_id, booking_id) in scheduled_flags {
            if let Some(flag) = tables.flags.iter_mut().find(|f| f.flag_id == flag_id) {
                flag.is_scheduled = true;
                flag.scheduled_booking_id = Some(booking_id);
            }
        }
        Ok(())
    }
}
