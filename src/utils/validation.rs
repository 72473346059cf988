//! Validation helpers
//!
//! Parsing of the date, time-of-day and timestamp formats accepted by the API.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::utils::errors::{validation_error, AppResult};

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| validation_error("Invalid date format. Use YYYY-MM-DD"))
}

/// Parse an `HH:MM` time of day, as stored for center operating hours
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Parse an ISO 8601 timestamp; naive values are taken as UTC
pub fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| validation_error(format!("Invalid timestamp '{}'", value)))
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Reject blank identifiers
pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(validation_error(format!("{} is required", field)));
    }
    Ok(())
}
