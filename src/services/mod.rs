//! Services module
//!
//! Business logic of the maintenance scheduler. The scoring, slot and
//! technician engines are pure; the services around them own a
//! `FleetStore` handle and are cheap to clone.

pub mod booking_service;
pub mod flag_tracker;
pub mod forecast_service;
pub mod notification_service;
pub mod orchestrator;
pub mod priority_scorer;
pub mod scheduling_service;
pub mod slot_allocator;
pub mod technician_matcher;
pub mod telemetry_simulator;

pub use booking_service::BookingService;
pub use flag_tracker::FlagTracker;
pub use forecast_service::ForecastService;
pub use notification_service::NotificationService;
pub use orchestrator::OrchestratorService;
pub use priority_scorer::PriorityScorer;
pub use scheduling_service::SchedulingService;
pub use slot_allocator::SlotAllocator;
pub use telemetry_simulator::TelemetrySimulator;
