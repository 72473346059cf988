//! Request and response bodies of the HTTP API

pub mod api_response;
pub mod forecast_dto;
pub mod gateway_dto;
pub mod orchestration_dto;
pub mod scheduling_dto;
pub mod telemetry_dto;

pub use api_response::ApiResponse;
