//! Service configuration
//!
//! Environment variables, database pool settings and the typed tunables of
//! each engine.

pub mod database;
pub mod environment;
pub mod scheduling;

pub use database::DatabaseConfig;
pub use environment::{EnvironmentConfig, StorageBackend};
pub use scheduling::{ForecastConfig, OrchestrationConfig, SchedulingConfig, SimulatorConfig};
