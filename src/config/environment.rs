//! Environment configuration
//!
//! Reads process settings from environment variables, falling back to
//! development defaults.

use std::env;
use std::str::FromStr;

use crate::utils::errors::{validation_error, AppResult};

/// Which `FleetStore` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = crate::utils::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in_memory" => Ok(StorageBackend::Memory),
            other => Err(validation_error(format!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub cors_origins: Vec<String>,
    pub predictor_url: String,
    pub report_service_url: String,
    pub simulator_interval_seconds: u64,
    pub simulator_batch_size: i64,
    pub shuffle_centers: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            database_url: None,
            storage_backend: StorageBackend::Memory,
            cors_origins: Vec::new(),
            predictor_url: "http://localhost:5001".to_string(),
            report_service_url: "http://localhost:5002".to_string(),
            simulator_interval_seconds: 100,
            simulator_batch_size: 3,
            shuffle_centers: true,
        }
    }
}

impl EnvironmentConfig {
    /// Build the configuration from the environment.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an
    /// error. `STORAGE_BACKEND` defaults to `postgres` when `DATABASE_URL`
    /// is present and to `memory` otherwise.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) if database_url.is_some() => StorageBackend::Postgres,
            Err(_) => StorageBackend::Memory,
        };

        let config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            database_url,
            storage_backend,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            predictor_url: env::var("PREDICTOR_URL").unwrap_or(defaults.predictor_url),
            report_service_url: env::var("REPORT_SERVICE_URL")
                .unwrap_or(defaults.report_service_url),
            simulator_interval_seconds: parse_var(
                "SIMULATOR_INTERVAL_SECONDS",
                defaults.simulator_interval_seconds,
            )?,
            simulator_batch_size: parse_var("SIMULATOR_BATCH_SIZE", defaults.simulator_batch_size)?,
            shuffle_centers: parse_var("SHUFFLE_CENTERS", defaults.shuffle_centers)?,
        };

        if config.storage_backend == StorageBackend::Postgres && config.database_url.is_none() {
            return Err(validation_error(
                "DATABASE_URL must be set when STORAGE_BACKEND=postgres",
            ));
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Address the HTTP listener binds to
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| validation_error(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_server_url() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert!(config.is_development());
        assert!(!config.is_production());
    }
}
