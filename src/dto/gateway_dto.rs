use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentHealth {
    Healthy,
    Down,
}

impl From<bool> for ComponentHealth {
    fn from(up: bool) -> Self {
        if up {
            ComponentHealth::Healthy
        } else {
            ComponentHealth::Down
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: ComponentHealth,
    pub service: &'static str,
    pub version: &'static str,
    pub storage: ComponentHealth,
    pub services: BTreeMap<&'static str, ComponentHealth>,
    pub simulator_running: bool,
}
