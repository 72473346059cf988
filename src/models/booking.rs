//! Booking model
//!
//! A booking holds one bay of a service center for one slot. Its status only
//! moves along `provisional -> confirmed -> in_progress -> completed`;
//! `cancelled` is reachable from `provisional` and `confirmed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;

use crate::utils::errors::{validation_error, AppError};

/// Booking status - maps to the `booking_status` enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Provisional,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that occupy a bay
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Provisional,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
    ];

    /// Statuses that make a technician unavailable
    pub const TECHNICIAN_BUSY: [BookingStatus; 2] =
        [BookingStatus::Confirmed, BookingStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Provisional => "provisional",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn occupies_bay(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "provisional" => Ok(BookingStatus::Provisional),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "in_progress" => Ok(BookingStatus::InProgress),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(validation_error(format!("Unknown booking status '{}'", other))),
        }
    }
}

/// A requested move along the booking state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTransition {
    Confirm,
    Start,
    Complete,
    Cancel,
}

impl BookingTransition {
    /// Statuses the transition may start from
    pub fn allowed_from(&self) -> &'static [BookingStatus] {
        match self {
            BookingTransition::Confirm => &[BookingStatus::Provisional],
            BookingTransition::Start => &[BookingStatus::Confirmed],
            BookingTransition::Complete => &[BookingStatus::InProgress],
            BookingTransition::Cancel => &[BookingStatus::Provisional, BookingStatus::Confirmed],
        }
    }

    pub fn target(&self) -> BookingStatus {
        match self {
            BookingTransition::Confirm => BookingStatus::Confirmed,
            BookingTransition::Start => BookingStatus::InProgress,
            BookingTransition::Complete => BookingStatus::Completed,
            BookingTransition::Cancel => BookingStatus::Cancelled,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            BookingTransition::Confirm => "confirm",
            BookingTransition::Start => "start",
            BookingTransition::Complete => "complete",
            BookingTransition::Cancel => "cancel",
        }
    }

    pub fn is_allowed_from(&self, current: BookingStatus) -> bool {
        self.allowed_from().contains(&current)
    }
}

/// Severity bucket derived from a flag's severity score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "severity_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            SeverityLevel::Critical
        } else if score >= 60.0 {
            SeverityLevel::High
        } else if score >= 40.0 {
            SeverityLevel::Medium
        } else {
            SeverityLevel::Low
        }
    }
}

/// Booking row, mirrors the `bookings` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub booking_id: String,
    pub vehicle_id: String,
    pub center_id: String,
    pub tech_id: Option<String>,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub status: BookingStatus,
    pub priority_score: f64,
    pub severity_level: SeverityLevel,
    pub service_type: String,
    pub estimated_duration_minutes: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Open-interval overlap with `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.slot_start < end && self.slot_end > start
    }

    /// Whether `instant` falls inside `[slot_start, slot_end)`
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.slot_start <= instant && instant < self.slot_end
    }

    /// Apply a transition in memory, stamping the matching timestamp
    pub fn apply(&mut self, transition: BookingTransition, at: DateTime<Utc>) {
        self.status = transition.target();
        match transition {
            BookingTransition::Confirm => self.confirmed_at = Some(at),
            BookingTransition::Complete => self.completed_at = Some(at),
            BookingTransition::Start | BookingTransition::Cancel => {}
        }
    }
}

/// Filters accepted by the booking listing
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub center_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub limit: Option<i64>,
}
