//! Yield Server - crop yield prediction service
//!
//! Loads the training CSV, fits the model, then serves predictions over HTTP.
//! Any failure before the model is installed aborts startup.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yield_core::{
    health::{components, HealthRegistry},
    ModelLifecycle, PredictionService, ServiceMetrics, StructuredLogger,
};
use yield_server::{api, config::ServerConfig, startup};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(SERVICE_VERSION, &config.data_path, config.port);

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATASET).await;
    health_registry.register(components::TRAINER).await;
    health_registry.register(components::PREDICTOR).await;

    let metrics = ServiceMetrics::new();
    let lifecycle = ModelLifecycle::new(logger.clone());

    let model = match startup::train_initial_model(&config, &logger, &lifecycle, &health_registry)
        .await
    {
        Ok(model) => model,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Startup aborted, no model installed");
            return Err(e);
        }
    };
    let version = lifecycle.install(model);
    info!(version = %version, "Model ready, accepting requests");

    let service = PredictionService::new(lifecycle, metrics.clone(), logger.clone());
    let state = Arc::new(api::AppState::new(health_registry, metrics, service));

    let shutdown_logger = logger.clone();
    api::serve(config.port, state, async move {
        shutdown_signal().await;
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
