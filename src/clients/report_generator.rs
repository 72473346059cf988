//! Narrative report generator client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// `request` carries the vehicle data and its prediction
    async fn generate(&self, request: &Value) -> AppResult<Value>;
    async fn is_healthy(&self) -> bool;
}

pub struct HttpReportGenerator {
    client: Client,
    base_url: String,
}

impl HttpReportGenerator {
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
impl ReportGenerator for HttpReportGenerator {
    async fn generate(&self, request: &Value) -> AppResult<Value> {
        let url = format!("{}/generate_report", self.base_url);
        info!("📝 Forwarding report request to {}", url);

        let response = self.client.post(&url).json(request).send().await.map_err(|e| {
            error!("❌ Report service unavailable: {}", e);
            AppError::DependencyUnavailable("Report service unavailable".to_string())
        })?;
        let status = response.status();
        if !status.is_success() {
            error!("❌ Report service returned {}", status);
            return Err(AppError::DependencyUnavailable(format!(
                "Report service returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Unreadable report response: {}", e)))
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        matches!(self.client.get(url).send().await, Ok(r) if r.status().is_success())
    }
}
