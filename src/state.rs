//! Shared application state
//!
//! Every service handle the routers need. Cloning is cheap: services hold
//! `Arc`s to the store and collaborators.

use std::sync::Arc;
use std::time::Duration;

use crate::clients::{
    HttpPredictor, HttpReportGenerator, LoggingDispatcher, NotificationDispatcher, Predictor,
    ReportGenerator,
};
use crate::config::{
    EnvironmentConfig, ForecastConfig, OrchestrationConfig, SchedulingConfig, SimulatorConfig,
};
use crate::repositories::FleetStore;
use crate::services::{
    FlagTracker, ForecastService, NotificationService, OrchestratorService, SchedulingService,
    TelemetrySimulator,
};
use crate::utils::errors::AppResult;

const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// External collaborators, swappable in tests
#[derive(Clone)]
pub struct Collaborators {
    pub predictor: Arc<dyn Predictor>,
    pub reports: Arc<dyn ReportGenerator>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
}

impl Collaborators {
    /// HTTP clients for the predictor and report service, logging dispatcher
    pub fn from_config(config: &EnvironmentConfig) -> AppResult<Self> {
        Ok(Self {
            predictor: Arc::new(HttpPredictor::new(&config.predictor_url, COLLABORATOR_TIMEOUT)?),
            reports: Arc::new(HttpReportGenerator::new(
                &config.report_service_url,
                COLLABORATOR_TIMEOUT,
            )?),
            dispatcher: Arc::new(LoggingDispatcher),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn FleetStore>,
    pub scheduling: SchedulingService,
    pub forecasts: ForecastService,
    pub flags: FlagTracker,
    pub notifications: NotificationService,
    pub orchestrator: OrchestratorService,
    pub simulator: Arc<TelemetrySimulator>,
    pub predictor: Arc<dyn Predictor>,
    pub reports: Arc<dyn ReportGenerator>,
}

impl AppState {
    /// Wire every service onto one store. Fails when a tunable block does
    /// not validate.
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn FleetStore>,
        collaborators: Collaborators,
    ) -> AppResult<Self> {
        let scheduling_config = SchedulingConfig {
            shuffle_centers: config.shuffle_centers,
            ..SchedulingConfig::default()
        };
        let forecast_config = ForecastConfig::default();
        let orchestration_config = OrchestrationConfig::default();
        let simulator_config = SimulatorConfig {
            interval_seconds: config.simulator_interval_seconds,
            batch_size: config.simulator_batch_size,
            ..SimulatorConfig::default()
        };
        scheduling_config.validate()?;
        forecast_config.validate()?;
        orchestration_config.validate()?;
        simulator_config.validate()?;

        let scheduling = SchedulingService::new(store.clone(), scheduling_config);
        let forecasts = ForecastService::new(store.clone(), forecast_config.clone());
        let flags = FlagTracker::new(store.clone(), &forecast_config);
        let notifications = NotificationService::new(store.clone(), collaborators.dispatcher);
        let orchestrator = OrchestratorService::new(
            forecasts.clone(),
            flags.clone(),
            scheduling.clone(),
            notifications.clone(),
            orchestration_config,
        );
        let simulator = Arc::new(TelemetrySimulator::new(
            store.clone(),
            flags.clone(),
            simulator_config,
        ));

        Ok(Self {
            config,
            store,
            scheduling,
            forecasts,
            flags,
            notifications,
            orchestrator,
            simulator,
            predictor: collaborators.predictor,
            reports: collaborators.reports,
        })
    }
}
