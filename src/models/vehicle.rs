//! Vehicle model
//!
//! Fleet reference data. Bookings and maintenance flags refer to a vehicle by
//! id and never own it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Customer tier used by priority scoring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Standard,
    Premium,
    Fleet,
}

impl CustomerType {
    /// Unknown tiers score as standard
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "fleet" => CustomerType::Fleet,
            "premium" => CustomerType::Premium,
            _ => CustomerType::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Standard => "standard",
            CustomerType::Premium => "premium",
            CustomerType::Fleet => "fleet",
        }
    }
}

/// Vehicle row, mirrors the `vehicles` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub vin: String,
    pub model: String,
    pub year: Option<i32>,
    pub owner_name: String,
    pub owner_contact: String,
    pub owner_email: Option<String>,
    pub mileage: i64,
    pub last_service_date: Option<DateTime<Utc>>,
    /// Free-form label; see [`Vehicle::customer_tier`]
    pub customer_type: String,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn customer_tier(&self) -> CustomerType {
        CustomerType::from_label(&self.customer_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_type_labels() {
        assert_eq!(CustomerType::from_label("fleet"), CustomerType::Fleet);
        assert_eq!(CustomerType::from_label("Premium"), CustomerType::Premium);
        assert_eq!(CustomerType::from_label("standard"), CustomerType::Standard);
        assert_eq!(CustomerType::from_label("gold"), CustomerType::Standard);
        assert_eq!(CustomerType::from_label(""), CustomerType::Standard);
    }
}
