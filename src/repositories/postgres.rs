//! PostgreSQL `FleetStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{
    Booking, BookingFilter, BookingStatus, BookingTransition, Forecast, MaintenanceFlag,
    NewForecast, NewMaintenanceFlag, NewNotification, NewTelemetrySample, Notification,
    ServiceCenter, TelemetrySample, Technician, Vehicle,
};
use crate::repositories::{FleetStore, StoreTx};
use crate::utils::errors::{invalid_transition_error, not_found_error, AppResult};

fn status_labels(statuses: &[BookingStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

#[derive(Clone)]
pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn get_vehicle(&self, vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE vehicle_id = $1")
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&self, limit: i64) -> AppResult<Vec<Vehicle>> {
        let vehicles =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY vehicle_id LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(vehicles)
    }

    async fn get_center(&self, center_id: &str) -> AppResult<Option<ServiceCenter>> {
        let center = sqlx::query_as::<_, ServiceCenter>(
            "SELECT * FROM service_centers WHERE center_id = $1",
        )
        .bind(center_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(center)
    }

    async fn list_active_centers(&self, region: Option<&str>) -> AppResult<Vec<ServiceCenter>> {
        let centers = sqlx::query_as::<_, ServiceCenter>(
            r#"
            SELECT * FROM service_centers
            WHERE is_active = TRUE AND ($1::text IS NULL OR region = $1)
            ORDER BY center_id
            "#,
        )
        .bind(region)
        .fetch_all(&self.pool)
        .await?;
        Ok(centers)
    }

    async fn get_technician(&self, tech_id: &str) -> AppResult<Option<Technician>> {
        let technician =
            sqlx::query_as::<_, Technician>("SELECT * FROM technicians WHERE tech_id = $1")
                .bind(tech_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(technician)
    }

    async fn active_bookings_for_center(
        &self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let active = status_labels(&BookingStatus::ACTIVE);
        let bookings = sqlx::query_as::<_, Booking>(ACTIVE_BOOKINGS_SQL)
            .bind(center_id)
            .bind(from)
            .bind(to)
            .bind(&active)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    async fn get_booking(&self, booking_id: &str) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR center_id = $2)
              AND ($3::text IS NULL OR vehicle_id = $3)
            ORDER BY slot_start DESC
            LIMIT $4
            "#,
        )
        .bind(filter.status)
        .bind(filter.center_id.as_deref())
        .bind(filter.vehicle_id.as_deref())
        .bind(filter.limit.unwrap_or(100))
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        booking_id: &str,
        transition: BookingTransition,
        at: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let allowed = status_labels(transition.allowed_from());
        let target = transition.target();
        let confirmed_at = (transition == BookingTransition::Confirm).then_some(at);
        let completed_at = (transition == BookingTransition::Complete).then_some(at);

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2,
                confirmed_at = COALESCE($3, confirmed_at),
                completed_at = COALESCE($4, completed_at)
            WHERE booking_id = $1 AND status::text = ANY($5)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(target)
        .bind(confirmed_at)
        .bind(completed_at)
        .bind(&allowed)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(booking) = updated {
            return Ok(booking);
        }

        match self.get_booking(booking_id).await? {
            None => Err(not_found_error("Booking", booking_id)),
            Some(current) => Err(invalid_transition_error(
                "booking",
                booking_id,
                current.status.as_str(),
                transition.verb(),
            )),
        }
    }

    async fn booking_created_times(
        &self,
        center_ids: &[String],
        since: DateTime<Utc>,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT created_at FROM bookings WHERE center_id = ANY($1) AND created_at >= $2",
        )
        .bind(center_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(created_at,)| created_at).collect())
    }

    async fn count_active_bookings_starting(
        &self,
        center_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let active = status_labels(&BookingStatus::ACTIVE);
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE center_id = ANY($1)
              AND slot_start >= $2 AND slot_start < $3
              AND status::text = ANY($4)
            "#,
        )
        .bind(center_ids)
        .bind(start)
        .bind(end)
        .bind(&active)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_telemetry(&self, sample: NewTelemetrySample) -> AppResult<TelemetrySample> {
        let stored = sqlx::query_as::<_, TelemetrySample>(
            r#"
            INSERT INTO telemetry (vehicle_id, timestamp, mileage, engine_load, oil_quality,
                                   battery_percent, brake_condition, brake_temp, tire_pressure,
                                   fuel_consumption)
            VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&sample.vehicle_id)
        .bind(sample.timestamp)
        .bind(sample.mileage)
        .bind(sample.engine_load)
        .bind(sample.oil_quality)
        .bind(sample.battery_percent)
        .bind(&sample.brake_condition)
        .bind(sample.brake_temp)
        .bind(sample.tire_pressure)
        .bind(sample.fuel_consumption)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn list_telemetry(
        &self,
        vehicle_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<TelemetrySample>> {
        let samples = sqlx::query_as::<_, TelemetrySample>(
            r#"
            SELECT * FROM telemetry
            WHERE ($1::text IS NULL OR vehicle_id = $1)
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(vehicle_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(samples)
    }

    async fn latest_telemetry_per_vehicle(
        &self,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<TelemetrySample>> {
        let samples = sqlx::query_as::<_, TelemetrySample>(
            r#"
            SELECT DISTINCT ON (vehicle_id) * FROM telemetry
            WHERE timestamp >= $1
            ORDER BY vehicle_id, timestamp DESC, id DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(samples)
    }

    async fn count_telemetry(&self) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM telemetry")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_flag_if_absent(
        &self,
        flag: NewMaintenanceFlag,
    ) -> AppResult<Option<MaintenanceFlag>> {
        // Conflicts are arbitrated by uq_maintenance_flags_open
        let inserted = sqlx::query_as::<_, MaintenanceFlag>(
            r#"
            INSERT INTO maintenance_flags (vehicle_id, flagged_at, maintenance_required,
                                           confidence, risk_factors, severity_score)
            VALUES ($1, $2, TRUE, $3, $4, $5)
            ON CONFLICT (vehicle_id) WHERE is_scheduled = FALSE AND resolved_at IS NULL
            DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&flag.vehicle_id)
        .bind(flag.flagged_at)
        .bind(flag.confidence)
        .bind(&flag.risk_factors)
        .bind(flag.severity_score)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn list_unresolved_flags(&self) -> AppResult<Vec<MaintenanceFlag>> {
        let flags = sqlx::query_as::<_, MaintenanceFlag>(
            r#"
            SELECT * FROM maintenance_flags
            WHERE is_scheduled = FALSE AND resolved_at IS NULL
            ORDER BY flagged_at, flag_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(flags)
    }

    async fn resolve_flag(&self, flag_id: i64, booking_id: &str) -> AppResult<MaintenanceFlag> {
        sqlx::query_as::<_, MaintenanceFlag>(
            r#"
            UPDATE maintenance_flags
            SET is_scheduled = TRUE, scheduled_booking_id = $2
            WHERE flag_id = $1
            RETURNING *
            "#,
        )
        .bind(flag_id)
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Maintenance flag", &flag_id.to_string()))
    }

    async fn insert_forecast(&self, forecast: NewForecast) -> AppResult<Forecast> {
        let stored = sqlx::query_as::<_, Forecast>(
            r#"
            INSERT INTO forecasts (region, window_start, window_end, estimated_requests,
                                   confidence_level, capacity_utilization, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&forecast.region)
        .bind(forecast.window_start)
        .bind(forecast.window_end)
        .bind(forecast.estimated_requests)
        .bind(forecast.confidence_level)
        .bind(forecast.capacity_utilization)
        .bind(forecast.generated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn forecasts_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Forecast>> {
        let forecasts = sqlx::query_as::<_, Forecast>(
            r#"
            SELECT * FROM forecasts
            WHERE generated_at >= $1
            ORDER BY generated_at DESC, forecast_id DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(forecasts)
    }

    async fn insert_notification(&self, notification: NewNotification) -> AppResult<Notification> {
        let stored = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (booking_id, recipient_name, recipient_contact,
                                       recipient_email, channel, template, message_content,
                                       status, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&notification.booking_id)
        .bind(&notification.recipient_name)
        .bind(&notification.recipient_contact)
        .bind(&notification.recipient_email)
        .bind(&notification.channel)
        .bind(notification.template.as_str())
        .bind(&notification.message_content)
        .bind(notification.status.as_str())
        .bind(notification.sent_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn list_notifications(
        &self,
        booking_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE ($1::text IS NULL OR booking_id = $1)
            ORDER BY sent_at DESC, notification_id DESC
            LIMIT $2
            "#,
        )
        .bind(booking_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }
}

const ACTIVE_BOOKINGS_SQL: &str = r#"
    SELECT * FROM bookings
    WHERE center_id = $1
      AND slot_start < $3 AND slot_end > $2
      AND status::text = ANY($4)
    ORDER BY slot_start
"#;

/// Transaction-backed unit of work
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_centers(&mut self, center_ids: &[String]) -> AppResult<()> {
        // Ascending order keeps concurrent batches from deadlocking
        let mut ordered: Vec<&String> = center_ids.iter().collect();
        ordered.sort();
        ordered.dedup();
        for center_id in ordered {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended('center:' || $1, 0))")
                .bind(center_id)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn get_vehicle(&mut self, vehicle_id: &str) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE vehicle_id = $1")
            .bind(vehicle_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn active_bookings_for_center(
        &mut self,
        center_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let active = status_labels(&BookingStatus::ACTIVE);
        let bookings = sqlx::query_as::<_, Booking>(ACTIVE_BOOKINGS_SQL)
            .bind(center_id)
            .bind(from)
            .bind(to)
            .bind(&active)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(bookings)
    }

    async fn available_technicians(&mut self, center_id: &str) -> AppResult<Vec<Technician>> {
        let technicians = sqlx::query_as::<_, Technician>(
            r#"
            SELECT * FROM technicians
            WHERE center_id = $1 AND is_available = TRUE
            ORDER BY tech_id
            "#,
        )
        .bind(center_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(technicians)
    }

    async fn technician_bookings(
        &mut self,
        tech_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Booking>> {
        let busy = status_labels(&BookingStatus::TECHNICIAN_BUSY);
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE tech_id = ANY($1)
              AND slot_start < $3 AND slot_end > $2
              AND status::text = ANY($4)
            "#,
        )
        .bind(tech_ids)
        .bind(from)
        .bind(to)
        .bind(&busy)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(bookings)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, vehicle_id, center_id, tech_id, slot_start,
                                  slot_end, status, priority_score, severity_level,
                                  service_type, estimated_duration_minutes, notes, created_at,
                                  confirmed_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(&booking.booking_id)
        .bind(&booking.vehicle_id)
        .bind(&booking.center_id)
        .bind(&booking.tech_id)
        .bind(booking.slot_start)
        .bind(booking.slot_end)
        .bind(booking.status)
        .bind(booking.priority_score)
        .bind(booking.severity_level)
        .bind(&booking.service_type)
        .bind(booking.estimated_duration_minutes)
        .bind(&booking.notes)
        .bind(booking.created_at)
        .bind(booking.confirmed_at)
        .bind(booking.completed_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn latest_unresolved_flag(
        &mut self,
        vehicle_id: &str,
    ) -> AppResult<Option<MaintenanceFlag>> {
        let flag = sqlx::query_as::<_, MaintenanceFlag>(
            r#"
            SELECT * FROM maintenance_flags
            WHERE vehicle_id = $1 AND is_scheduled = FALSE AND resolved_at IS NULL
            ORDER BY flagged_at DESC, flag_id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(flag)
    }

    async fn mark_flag_scheduled(&mut self, flag_id: i64, booking_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE maintenance_flags
            SET is_scheduled = TRUE, scheduled_booking_id = $2
            WHERE flag_id = $1
            "#,
        )
        .bind(flag_id)
        .bind(booking_id)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Maintenance flag", &flag_id.to_string()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
