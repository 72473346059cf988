use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::clients::{Prediction, Predictor, ReportGenerator};
use crate::dto::gateway_dto::{ComponentHealth, HealthResponse};
use crate::repositories::FleetStore;
use crate::services::TelemetrySimulator;
use crate::utils::errors::{validation_error, AppError};

pub struct GatewayController {
    predictor: Arc<dyn Predictor>,
    reports: Arc<dyn ReportGenerator>,
    store: Arc<dyn FleetStore>,
    simulator: Arc<TelemetrySimulator>,
}

impl GatewayController {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        reports: Arc<dyn ReportGenerator>,
        store: Arc<dyn FleetStore>,
        simulator: Arc<TelemetrySimulator>,
    ) -> Self {
        Self {
            predictor,
            reports,
            store,
            simulator,
        }
    }

    pub async fn predict(&self, features: Value) -> Result<Prediction, AppError> {
        require_payload(&features)?;
        info!("📥 Received prediction request");
        let prediction = self.predictor.predict(&features).await?;
        info!("✅ Analysis success. Maintenance: {}", prediction.maintenance_required);
        Ok(prediction)
    }

    pub async fn report(&self, request: Value) -> Result<Value, AppError> {
        require_payload(&request)?;
        info!("📝 Received report generation request");
        let report = self.reports.generate(&request).await?;
        info!("✅ Report generated successfully");
        Ok(report)
    }

    /// Always answers; a down collaborator only shows up in `services`
    pub async fn health(&self) -> HealthResponse {
        let storage = ComponentHealth::from(self.store.ping().await.is_ok());
        let (predictor, reports) = tokio::join!(self.predictor.is_healthy(), self.reports.is_healthy());

        let mut services = BTreeMap::new();
        services.insert("predictor", ComponentHealth::from(predictor));
        services.insert("report_generator", ComponentHealth::from(reports));

        HealthResponse {
            status: ComponentHealth::Healthy,
            service: "maintenance_scheduling",
            version: env!("CARGO_PKG_VERSION"),
            storage,
            services,
            simulator_running: self.simulator.is_running(),
        }
    }
}

fn require_payload(body: &Value) -> Result<(), AppError> {
    let empty = match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(validation_error("No data provided"));
    }
    Ok(())
}
