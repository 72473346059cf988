//! Forecast and notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::utils::errors::{validation_error, AppError};

/// Regional demand forecast, append-only
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Forecast {
    pub forecast_id: i64,
    pub region: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub estimated_requests: i64,
    /// Within `(0, 1]`
    pub confidence_level: f64,
    /// Percentage within `[0, 100]`
    pub capacity_utilization: f64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewForecast {
    pub region: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub estimated_requests: i64,
    pub confidence_level: f64,
    pub capacity_utilization: f64,
    pub generated_at: DateTime<Utc>,
}

/// Demand direction over the lookback window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

/// Message kind sent to a vehicle owner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    BookingConfirmation,
    Reminder,
    Completion,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::BookingConfirmation => "booking_confirmation",
            NotificationTemplate::Reminder => "reminder",
            NotificationTemplate::Completion => "completion",
        }
    }
}

impl FromStr for NotificationTemplate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "booking_confirmation" => Ok(NotificationTemplate::BookingConfirmation),
            "reminder" => Ok(NotificationTemplate::Reminder),
            "completion" => Ok(NotificationTemplate::Completion),
            other => Err(validation_error(format!("Unknown notification type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Pending,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Pending => "pending",
        }
    }
}

/// Audit record of a message sent about a booking
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub booking_id: String,
    pub recipient_name: String,
    pub recipient_contact: String,
    pub recipient_email: Option<String>,
    /// sms, email, both
    pub channel: String,
    pub template: String,
    pub message_content: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub booking_id: String,
    pub recipient_name: String,
    pub recipient_contact: String,
    pub recipient_email: Option<String>,
    pub channel: String,
    pub template: NotificationTemplate,
    pub message_content: String,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_template_labels() {
        assert_eq!(
            "booking_confirmation".parse::<NotificationTemplate>().unwrap(),
            NotificationTemplate::BookingConfirmation
        );
        assert_eq!(NotificationTemplate::Reminder.as_str(), "reminder");
        assert!("sms_blast".parse::<NotificationTemplate>().is_err());
    }
}
