//! Service center and technician models

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::validation::parse_time_of_day;

/// Service center row, mirrors the `service_centers` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceCenter {
    pub center_id: String,
    pub name: String,
    pub region: String,
    pub location: String,
    pub capacity_bays: i32,
    /// `HH:MM`
    pub operating_hours_start: String,
    /// `HH:MM`
    pub operating_hours_end: String,
    pub contact_phone: Option<String>,
    pub is_active: bool,
}

/// Parsed daily opening window of a center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl OperatingHours {
    /// `[opens, closes)`
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.opens && time < self.closes
    }
}

impl ServiceCenter {
    /// `None` when either bound is unparsable or the window wraps past
    /// midnight, which slot discovery does not support.
    pub fn operating_hours(&self) -> Option<OperatingHours> {
        let opens = parse_time_of_day(&self.operating_hours_start)?;
        let closes = parse_time_of_day(&self.operating_hours_end)?;
        if opens >= closes {
            return None;
        }
        Some(OperatingHours { opens, closes })
    }
}

/// Technician row, mirrors the `technicians` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Technician {
    pub tech_id: String,
    pub name: String,
    /// junior, senior, expert
    pub skill_level: String,
    pub center_id: String,
    pub specialization: Option<String>,
    pub is_available: bool,
}
