//! Domain models
//!
//! Row types for every table plus the small enums the scheduling engine
//! reasons about.

pub mod booking;
pub mod forecast;
pub mod maintenance_flag;
pub mod service_center;
pub mod vehicle;

pub use booking::{Booking, BookingFilter, BookingStatus, BookingTransition, SeverityLevel};
pub use forecast::{
    DeliveryStatus, Forecast, NewForecast, NewNotification, Notification, NotificationTemplate,
    Trend,
};
pub use maintenance_flag::{MaintenanceFlag, NewMaintenanceFlag, NewTelemetrySample, TelemetrySample};
pub use service_center::{OperatingHours, ServiceCenter, Technician};
pub use vehicle::{CustomerType, Vehicle};
