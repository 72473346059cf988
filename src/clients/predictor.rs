//! Maintenance-risk predictor client
//!
//! The predictor is an opaque HTTP oracle: it validates a vehicle feature
//! record and answers whether maintenance is required.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::utils::errors::{validation_error, AppError, AppResult};

/// Predictor verdict; fields the service does not interpret pass through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub maintenance_required: bool,
    /// 0 to 100
    pub confidence: f64,
    /// 0 to 1
    pub probability: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, features: &Value) -> AppResult<Prediction>;
    async fn is_healthy(&self) -> bool;
}

pub struct HttpPredictor {
    client: Client,
    base_url: String,
}

impl HttpPredictor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, features: &Value) -> AppResult<Prediction> {
        let url = format!("{}/analyze", self.base_url);
        info!("➡️ Forwarding to predictor: {}", url);

        let response = self.client.post(&url).json(features).send().await.map_err(|e| {
            error!("❌ Predictor unavailable: {}", e);
            AppError::DependencyUnavailable("Predictor unavailable".to_string())
        })?;
        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Predictor returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Unreadable predictor response: {}", e)))?;
        if body.get("status").and_then(Value::as_str) == Some("invalid") {
            let errors: Vec<String> = body
                .get("errors")
                .and_then(Value::as_array)
                .map(|errs| errs.iter().filter_map(|e| e.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            warn!("❌ Predictor rejected features: {:?}", errors);
            return Err(validation_error(format!("Validation failed: {}", errors.join("; "))));
        }

        serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("Unexpected predictor response: {}", e)))
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        matches!(self.client.get(url).send().await, Ok(r) if r.status().is_success())
    }
}
