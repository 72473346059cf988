use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Booking, BookingFilter, BookingStatus};
use crate::services::scheduling_service::{check_window, BatchOutcome, FailedVehicle};
use crate::utils::errors::AppResult;
use crate::utils::validation::{parse_date, start_of_day};

const DEFAULT_BATCH_DAYS: i64 = 7;

// Query de /api/getSlots
#[derive(Debug, Deserialize, Validate)]
pub struct SlotsQuery {
    #[validate(required(message = "center_id and date are required"))]
    pub center_id: Option<String>,
    /// YYYY-MM-DD
    #[validate(required(message = "center_id and date are required"))]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub center_id: String,
    pub date: String,
    pub available_slots: Vec<DateTime<Utc>>,
    pub total_slots: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    /// `[start 00:00, end 00:00)` in UTC; start defaults to today and end to
    /// a week later. Reversed ranges and ranges over a year are rejected.
    pub fn window(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let today = Utc::now().date_naive();
        let start = match &self.start {
            Some(s) => parse_date(s)?,
            None => today,
        };
        let end = match &self.end {
            Some(s) => parse_date(s)?,
            None => today + Duration::days(DEFAULT_BATCH_DAYS),
        };
        let (start, end) = (start_of_day(start), start_of_day(end));
        check_window(start, end)?;
        Ok((start, end))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleBatchRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "No vehicles provided"))]
    pub vehicles: Vec<String>,
    #[serde(default)]
    pub preferred_date_range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct ScheduleBatchResponse {
    pub scheduled_count: usize,
    pub failed_count: usize,
    pub bookings: Vec<Booking>,
    pub failed_vehicles: Vec<FailedVehicle>,
}

impl From<BatchOutcome> for ScheduleBatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            scheduled_count: outcome.scheduled_count(),
            failed_count: outcome.failed_count(),
            bookings: outcome.bookings,
            failed_vehicles: outcome.failed_vehicles,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmBookingRequest {
    #[validate(required(message = "booking_id is required"))]
    pub booking_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub center_id: Option<String>,
    pub vehicle_id: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
}

impl BookingsQuery {
    pub fn into_filter(self) -> AppResult<BookingFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<BookingStatus>)
            .transpose()?;
        Ok(BookingFilter {
            status,
            center_id: self.center_id,
            vehicle_id: self.vehicle_id,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_defaults_to_one_week() {
        let (start, end) = DateRange::default().window().unwrap();
        assert_eq!(end - start, Duration::days(7));
        assert_eq!(start, start_of_day(Utc::now().date_naive()));
    }

    #[test]
    fn test_date_range_rejects_bad_dates() {
        let range = DateRange {
            start: Some("07/12/2025".to_string()),
            end: None,
        };
        assert!(range.window().is_err());
    }

    #[test]
    fn test_date_range_rejects_reversed_and_oversized_spans() {
        let range = |start: &str, end: &str| DateRange {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        };
        assert!(range("2030-03-05", "2030-03-04").window().is_err());
        assert!(range("0001-01-01", "9999-12-31").window().is_err());
        assert!(range("2030-01-01", "2031-01-02").window().is_err());

        let (start, end) = range("2030-01-01", "2031-01-01").window().unwrap();
        assert_eq!(end - start, Duration::days(365));
    }

    #[test]
    fn test_bookings_query_status() {
        let query = BookingsQuery {
            status: Some("confirmed".to_string()),
            center_id: None,
            vehicle_id: None,
            limit: None,
        };
        assert_eq!(query.into_filter().unwrap().status, Some(BookingStatus::Confirmed));

        let query = BookingsQuery {
            status: Some("pending".to_string()),
            center_id: None,
            vehicle_id: None,
            limit: None,
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn test_empty_batch_fails_validation() {
        let request: ScheduleBatchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_err());
    }
}
