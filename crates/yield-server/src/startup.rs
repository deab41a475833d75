//! Startup sequence: load the dataset, build the training set, fit the first model

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use yield_core::{
    build_dataset,
    health::{components, HealthRegistry},
    load_csv, DenseTrainer, ModelLifecycle, StructuredLogger, TrainedModel,
};

/// Load, build and train in order, recording each stage's health
pub async fn train_initial_model(
    config: &ServerConfig,
    logger: &StructuredLogger,
    lifecycle: &ModelLifecycle,
    health: &HealthRegistry,
) -> Result<TrainedModel> {
    let data_path = config.data_path.clone();
    let loaded = tokio::task::spawn_blocking(move || load_csv(data_path))
        .await
        .context("Dataset load task panicked")?;
    let rows = match loaded {
        Ok(rows) => rows,
        Err(e) => {
            health.set_unhealthy(components::DATASET, e.to_string()).await;
            return Err(e).context("Failed to load training data");
        }
    };

    let set = match build_dataset(&rows) {
        Ok(set) => set,
        Err(e) => {
            health.set_unhealthy(components::DATASET, e.to_string()).await;
            return Err(e).context("Failed to build training set");
        }
    };
    logger.log_dataset_built(set.len(), set.dropped_rows(), set.profile().width());
    if set.dropped_rows() > 0 {
        health
            .set_degraded(
                components::DATASET,
                format!("{} incomplete rows excluded", set.dropped_rows()),
            )
            .await;
    }

    let trainer = DenseTrainer::new(config.trainer_config());
    let fitter = lifecycle.clone();
    let trained = tokio::task::spawn_blocking(move || fitter.fit(set, &trainer))
        .await
        .context("Training task panicked")?;

    match trained {
        Ok(model) => Ok(model),
        Err(e) => {
            health.set_unhealthy(components::TRAINER, e.to_string()).await;
            Err(e.context("Training failed"))
        }
    }
}
