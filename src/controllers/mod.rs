//! Controllers
//!
//! Validate request bodies, call the services and shape the responses.

pub mod forecast_controller;
pub mod gateway_controller;
pub mod orchestration_controller;
pub mod scheduling_controller;
pub mod telemetry_controller;
