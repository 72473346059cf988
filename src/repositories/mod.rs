//! Persistence layer
//!
//! `FleetStore` is the seam between the engines and storage. The PostgreSQL
//! implementation is used in deployments; the in-memory one backs the tests
//! and the zero-infrastructure demo mode.
//!
//! Booking creation runs inside a [`StoreTx`] unit of work. Callers lock
//! every center they may book into before reading its bookings, and the
//! locks are held until commit or drop. Dropping a unit of work without
//! committing discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Booking, BookingFilter, BookingTransition, Forecast, MaintenanceFlag, NewForecast,
    NewMaintenanceFlag, NewNotification, NewTelemetrySample, Notification, ServiceCenter,
    TelemetrySample, Technician, Vehicle,
};
use crate::utils::errors::AppResult;

pub use memory::MemoryStore;
pub use postgres::PgFleetStore;

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Cheap liveness probe
    async fn ping(&self) -> AppResult<()>;

    /// Open a unit of work
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    async fn get_vehicle(&self, vehicle_id: &str) -> AppResult<Option<Vehicle>>;
    /// Vehicles ordered by id
    async fn list_vehicles(&self, limit: i64) -> AppResult<Vec<Vehicle>>;
    async fn get_center(&self, center_id: &str) -> AppResult<Option<ServiceCenter>>;
    /// Active centers ordered by id, optionally restricted to one region
    async fn list_active_centers(&self, region: Option<&str>) -> AppResult<Vec<ServiceCenter>>;
    async fn get_technician(&self, tech_id: &str) -> AppResult<Option<Technician>>;

    /// Bay-occupying bookings of a center overlapping `[from, to)`
    async fn active_bookings_for_center(
        &self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>>;
    async fn get_booking(&self, booking_id: &str) -> AppResult<Option<Booking>>;
    /// Newest slot first
    async fn list_bookings(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>>;
    /// Conditional status update: succeeds only when the current status is
    /// one the transition may start from. Unknown ids are `NotFound`, any
    /// other status is a `StateConflict`.
    async fn transition_booking(
        &self,
        booking_id: &str,
        transition: BookingTransition,
        at: DateTime<Utc>,
    ) -> AppResult<Booking>;
    /// Creation times of every booking at the given centers since `since`
    async fn booking_created_times(
        &self,
        center_ids: &[String],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>>;
    /// Bay-occupying bookings whose slot starts in `[start, end)`
    async fn count_active_bookings_starting(
        &self,
        center_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64>;

    async fn insert_telemetry(&self, sample: NewTelemetrySample) -> AppResult<TelemetrySample>;
    /// Newest first
    async fn list_telemetry(
        &self,
        vehicle_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<TelemetrySample>>;
    /// The most recent reading of each vehicle reporting since `since`
    async fn latest_telemetry_per_vehicle(
        &self,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<TelemetrySample>>;
    async fn count_telemetry(&self) -> AppResult<i64>;

    /// Insert a flag unless the vehicle already has an unresolved one.
    /// Atomic per vehicle; `None` means a flag was already open.
    async fn insert_flag_if_absent(
        &self,
        flag: NewMaintenanceFlag,
    ) -> AppResult<Option<MaintenanceFlag>>;
    /// Unresolved flags, oldest first
    async fn list_unresolved_flags(&self) -> AppResult<Vec<MaintenanceFlag>>;
    /// Mark a flag scheduled and link its booking
    async fn resolve_flag(&self, flag_id: i64, booking_id: &str) -> AppResult<MaintenanceFlag>;

    async fn insert_forecast(&self, forecast: NewForecast) -> AppResult<Forecast>;
    /// Forecasts generated since `since`, newest first
    async fn forecasts_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Forecast>>;

    async fn insert_notification(&self, notification: NewNotification) -> AppResult<Notification>;
    /// Newest first
    async fn list_notifications(
        &self,
        booking_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<Notification>>;
}

/// Unit of work used by booking creation
#[async_trait]
pub trait StoreTx: Send {
    /// Serialize against every other unit of work touching these centers
    async fn lock_centers(&mut self, center_ids: &[String]) -> AppResult<()>;

    async fn get_vehicle(&mut self, vehicle_id: &str) -> AppResult<Option<Vehicle>>;
    async fn active_bookings_for_center(
        &mut self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>>;
    /// Available technicians of a center ordered by `tech_id`
    async fn available_technicians(&mut self, center_id: &str) -> AppResult<Vec<Technician>>;
    /// `confirmed` or `in_progress` bookings of these technicians overlapping `[from, to)`
    async fn technician_bookings(
        &mut self,
        tech_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>>;
    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()>;

    /// Most recently raised unresolved flag of a vehicle
    async fn latest_unresolved_flag(&mut self, vehicle_id: &str)
        -> AppResult<Option<MaintenanceFlag>>;
    async fn mark_flag_scheduled(&mut self, flag_id: i64, booking_id: &str) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
