//! Streaming telemetry simulator
//!
//! A background task that samples the first `batch_size` vehicles every
//! interval, generates a plausible reading for each and feeds it through the
//! flag tracker. About 30% of readings come from a degraded profile.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::SimulatorConfig;
use crate::models::{NewTelemetrySample, Vehicle};
use crate::repositories::FleetStore;
use crate::services::flag_tracker::FlagTracker;
use crate::utils::errors::{AppError, AppResult};

const BRAKE_CONDITIONS: [&str; 5] = ["Good", "Good", "Good", "Warning", "Poor"];
const DEGRADED_BRAKES: [&str; 2] = ["Warning", "Poor"];

#[derive(Debug, Clone, Serialize)]
pub struct SimulatorStatus {
    pub running: bool,
    pub config: SimulatorConfig,
    pub telemetry_count: i64,
    /// Vehicles with an open flag
    pub flagged_vehicles: usize,
}

pub struct TelemetrySimulator {
    store: Arc<dyn FleetStore>,
    flags: FlagTracker,
    config: SimulatorConfig,
    running: Mutex<Option<CancellationToken>>,
}

impl TelemetrySimulator {
    pub fn new(store: Arc<dyn FleetStore>, flags: FlagTracker, config: SimulatorConfig) -> Self {
        Self {
            store,
            flags,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().map(|r| r.is_some()).unwrap_or(false)
    }

    /// Spawn the sampling loop. Starting twice is a state conflict.
    pub fn start(self: &Arc<Self>) -> AppResult<()> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| AppError::Internal("Simulator state poisoned".to_string()))?;
        if running.is_some() {
            return Err(AppError::StateConflict("Simulator is already running".to_string()));
        }

        let token = CancellationToken::new();
        *running = Some(token.clone());

        let simulator = Arc::clone(self);
        tokio::spawn(async move {
            info!("🔄 Streaming simulator started");
            loop {
                if let Err(e) = simulator.run_once().await {
                    error!("❌ Error in simulator: {}", e);
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(simulator.config.interval()) => {}
                }
            }
            info!("⏹️ Streaming simulator stopped");
        });

        info!("▶️ Simulator started");
        Ok(())
    }

    /// Cancel the sampling loop; a tick already in flight finishes first
    pub fn stop(&self) -> AppResult<()> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| AppError::Internal("Simulator state poisoned".to_string()))?;
        match running.take() {
            Some(token) => {
                token.cancel();
                info!("⏹️ Simulator stopped");
                Ok(())
            }
            None => Err(AppError::StateConflict("Simulator is not running".to_string())),
        }
    }

    pub async fn status(&self) -> AppResult<SimulatorStatus> {
        Ok(SimulatorStatus {
            running: self.is_running(),
            config: self.config.clone(),
            telemetry_count: self.store.count_telemetry().await?,
            flagged_vehicles: self.flags.unresolved().await?.len(),
        })
    }

    /// One sampling round; returns how many readings were ingested
    pub async fn run_once(&self) -> AppResult<usize> {
        let vehicles = self.store.list_vehicles(self.config.batch_size).await?;
        let readings = generate_batch(&vehicles, self.config.degradation_probability);

        let mut ingested = 0;
        for reading in readings {
            let vehicle_id = reading.vehicle_id.clone();
            match self.flags.ingest(reading).await {
                Ok(_) => {
                    ingested += 1;
                    info!("📊 Telemetry ingested for {}", vehicle_id);
                }
                Err(e) if e.is_store_failure() => return Err(e),
                Err(e) => error!("❌ Could not ingest telemetry for {}: {}", vehicle_id, e),
            }
        }
        Ok(ingested)
    }
}

fn generate_batch(vehicles: &[Vehicle], degradation_probability: f64) -> Vec<NewTelemetrySample> {
    let mut rng = rand::thread_rng();
    vehicles
        .iter()
        .map(|v| generate_reading(v, degradation_probability, &mut rng))
        .collect()
}

/// A plausible reading; with `degradation_probability` oil, battery and
/// brakes come from a worn profile instead
pub fn generate_reading<R: Rng + ?Sized>(
    vehicle: &Vehicle,
    degradation_probability: f64,
    rng: &mut R,
) -> NewTelemetrySample {
    let mut reading = NewTelemetrySample {
        vehicle_id: vehicle.vehicle_id.clone(),
        timestamp: None,
        mileage: Some(vehicle.mileage + rng.gen_range(0..=50)),
        engine_load: Some(round_to(rng.gen_range(0.3..=0.9), 2)),
        oil_quality: Some(round_to(rng.gen_range(2.0..=9.0), 1)),
        battery_percent: Some(round_to(rng.gen_range(45.0..=100.0), 1)),
        brake_condition: BRAKE_CONDITIONS.choose(rng).map(|s| s.to_string()),
        brake_temp: Some(round_to(rng.gen_range(60.0..=120.0), 1)),
        tire_pressure: Some(round_to(rng.gen_range(26.0..=35.0), 1)),
        fuel_consumption: Some(round_to(rng.gen_range(6.0..=15.0), 1)),
    };

    if rng.gen_bool(degradation_probability.clamp(0.0, 1.0)) {
        reading.oil_quality = Some(round_to(rng.gen_range(1.5..=4.0), 1));
        reading.battery_percent = Some(round_to(rng.gen_range(40.0..=65.0), 1));
        reading.brake_condition = DEGRADED_BRAKES.choose(rng).map(|s| s.to_string());
    }
    reading
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForecastConfig;
    use crate::database::seed::sample_vehicle;
    use crate::repositories::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulator(store: &MemoryStore, batch_size: i64) -> Arc<TelemetrySimulator> {
        let shared: Arc<dyn FleetStore> = Arc::new(store.clone());
        let flags = FlagTracker::new(shared.clone(), &ForecastConfig::default());
        let config = SimulatorConfig {
            interval_seconds: 3600,
            batch_size,
            degradation_probability: 1.0,
        };
        Arc::new(TelemetrySimulator::new(shared, flags, config))
    }

    #[test]
    fn test_readings_stay_in_range() {
        let vehicle = sample_vehicle("V001", "fleet");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let r = generate_reading(&vehicle, 0.3, &mut rng);
            let oil = r.oil_quality.unwrap();
            let battery = r.battery_percent.unwrap();
            assert!((1.5..=9.0).contains(&oil));
            assert!((40.0..=100.0).contains(&battery));
            assert!((26.0..=35.0).contains(&r.tire_pressure.unwrap()));
            assert!(r.mileage.unwrap() >= vehicle.mileage);
            assert!(["Good", "Warning", "Poor"].contains(&r.brake_condition.as_deref().unwrap()));
        }
    }

    #[test]
    fn test_degraded_profile() {
        let vehicle = sample_vehicle("V001", "fleet");
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let r = generate_reading(&vehicle, 1.0, &mut rng);
            assert!(r.oil_quality.unwrap() <= 4.0);
            assert!(r.battery_percent.unwrap() <= 65.0);
            assert_ne!(r.brake_condition.as_deref(), Some("Good"));
        }
    }

    #[tokio::test]
    async fn test_run_once_ingests_and_flags() {
        let store = MemoryStore::new();
        for id in ["V001", "V002", "V003"] {
            store.add_vehicle(sample_vehicle(id, "standard"));
        }
        let simulator = simulator(&store, 2);

        assert_eq!(simulator.run_once().await.unwrap(), 2);
        let status = simulator.status().await.unwrap();
        assert!(!status.running);
        assert_eq!(status.telemetry_count, 2);
        assert!(status.flagged_vehicles <= 2);
        assert!(store.get_vehicle("V003").await.unwrap().is_some());
        assert!(store.list_telemetry(Some("V003"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_stop_state_machine() {
        let store = MemoryStore::new();
        let simulator = simulator(&store, 1);

        assert!(matches!(simulator.stop(), Err(AppError::StateConflict(_))));
        simulator.start().unwrap();
        assert!(simulator.is_running());
        assert!(matches!(simulator.start(), Err(AppError::StateConflict(_))));
        simulator.stop().unwrap();
        assert!(!simulator.is_running());
        assert!(matches!(simulator.stop(), Err(AppError::StateConflict(_))));

        // restart after a stop
        simulator.start().unwrap();
        simulator.stop().unwrap();
    }
}
