use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use maintenance_scheduling::config::{EnvironmentConfig, StorageBackend};
use maintenance_scheduling::database::seed::seed_demo_data;
use maintenance_scheduling::database::DatabaseConnection;
use maintenance_scheduling::repositories::{FleetStore, MemoryStore, PgFleetStore};
use maintenance_scheduling::routes::create_app;
use maintenance_scheduling::state::{AppState, Collaborators};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🔧 Fleet Maintenance Scheduling API");
    info!("==================================");

    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn FleetStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let db = match DatabaseConnection::connect(url).await {
                Ok(db) => db,
                Err(e) => {
                    error!("❌ Error connecting to the database: {:#}", e);
                    return Err(e);
                }
            };
            db.run_migrations().await?;
            Arc::new(PgFleetStore::new(db.pool().clone()))
        }
        StorageBackend::Memory => {
            warn!("⚠️ Using the in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            seed_demo_data(&store);
            Arc::new(store)
        }
    };

    let collaborators = Collaborators::from_config(&config)?;
    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;
    let state = AppState::new(config, store, collaborators)?;
    let app = create_app(state);

    info!("🌐 Server listening on http://{}", addr);
    info!("🔍 Endpoints:");
    info!("   GET  /health, POST /predict, POST /report");
    info!("   GET  /api/getSlots, POST /api/schedule_batch, POST /api/confirmBooking");
    info!("   GET  /api/bookings, POST /api/bookings/:id/{{cancel,start,complete}}");
    info!("   POST /api/forecast/generate, GET /api/forecast/{{regional,capacity}}, POST /api/forecast/feedback");
    info!("   POST /api/orchestrate/{{full_cycle,schedule_flagged}}");
    info!("   POST /api/notifications/send, GET /api/notifications");
    info!("   POST /api/ingest_telemetry, GET /api/telemetry");
    info!("   POST /api/simulator/{{start,stop}}, GET /api/simulator/status");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Server error: {}", e);
            e
        })?;

    info!("👋 Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Ctrl+C received, shutting down...");
        },
        _ = terminate => {
            info!("🛑 Termination signal received, shutting down...");
        },
    }
}
