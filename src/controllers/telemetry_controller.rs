use std::sync::Arc;
use validator::Validate;

use crate::dto::telemetry_dto::{
    IngestTelemetryRequest, IngestTelemetryResponse, SimulatorStartResponse, TelemetryListResponse,
    TelemetryQuery,
};
use crate::dto::ApiResponse;
use crate::services::telemetry_simulator::SimulatorStatus;
use crate::services::{FlagTracker, TelemetrySimulator};
use crate::utils::errors::AppError;

const DEFAULT_TELEMETRY_LIMIT: i64 = 50;

pub struct TelemetryController {
    flags: FlagTracker,
    simulator: Arc<TelemetrySimulator>,
}

impl TelemetryController {
    pub fn new(flags: FlagTracker, simulator: Arc<TelemetrySimulator>) -> Self {
        Self { flags, simulator }
    }

    pub async fn ingest(
        &self,
        request: IngestTelemetryRequest,
    ) -> Result<ApiResponse<IngestTelemetryResponse>, AppError> {
        request.validate()?;
        let outcome = self.flags.ingest(request.into_sample()?).await?;
        Ok(ApiResponse::success(IngestTelemetryResponse {
            vehicle_id: outcome.sample.vehicle_id,
            flagged_for_maintenance: outcome.flag.is_some(),
            timestamp: outcome.sample.timestamp,
            flag: outcome.flag,
        }))
    }

    pub async fn list(&self, query: TelemetryQuery) -> Result<TelemetryListResponse, AppError> {
        query.validate()?;
        let telemetry = self
            .flags
            .recent_telemetry(
                query.vehicle_id.as_deref(),
                query.limit.unwrap_or(DEFAULT_TELEMETRY_LIMIT),
            )
            .await?;
        Ok(TelemetryListResponse {
            count: telemetry.len(),
            telemetry,
        })
    }

    pub fn start_simulator(&self) -> Result<ApiResponse<SimulatorStartResponse>, AppError> {
        self.simulator.start()?;
        Ok(ApiResponse::success_with_message(
            SimulatorStartResponse {
                config: self.simulator.config().clone(),
            },
            "Streaming simulator started",
        ))
    }

    pub fn stop_simulator(&self) -> Result<ApiResponse<()>, AppError> {
        self.simulator.stop()?;
        Ok(ApiResponse::success_with_message((), "Streaming simulator stopped"))
    }

    pub async fn simulator_status(&self) -> Result<SimulatorStatus, AppError> {
        self.simulator.status().await
    }
}
