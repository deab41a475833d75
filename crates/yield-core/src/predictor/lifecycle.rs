//! Trained model lifecycle
//!
//! Holds the single (predictor, profile) pair served to requests. The pair is
//! published by replacing one `Arc`, so a reader either sees the previous
//! model or the new one, never a mix of both.

use super::{Predictor, Trainer};
use crate::error::ModelNotReady;
use crate::features::{build_dataset, SchemaProfile, TrainingSet};
use crate::models::{FeatureVector, RawRow};
use crate::observability::{ServiceMetrics, StructuredLogger};
use anyhow::{bail, Result};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// A predictor bound to the profile that encoded its training data
pub struct TrainedModel {
    predictor: Box<dyn Predictor>,
    profile: SchemaProfile,
    fingerprint: String,
    version: String,
    trained_at: i64,
    training_rows: usize,
    training_loss: f32,
}

impl TrainedModel {
    pub fn new(
        predictor: Box<dyn Predictor>,
        profile: SchemaProfile,
        training_rows: usize,
        training_loss: f32,
    ) -> Result<Self> {
        if predictor.input_width() != profile.width() {
            bail!(
                "predictor expects {} features but profile produces {}",
                predictor.input_width(),
                profile.width()
            );
        }

        Ok(Self {
            predictor,
            fingerprint: profile.fingerprint(),
            profile,
            version: String::new(),
            trained_at: chrono::Utc::now().timestamp(),
            training_rows,
            training_loss,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f32> {
        self.predictor.predict(features)
    }

    pub fn profile(&self) -> &SchemaProfile {
        &self.profile
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Assigned on install; empty before
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    pub fn training_loss(&self) -> f32 {
        self.training_loss
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("version", &self.version)
            .field("fingerprint", &self.fingerprint)
            .field("training_rows", &self.training_rows)
            .field("training_loss", &self.training_loss)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    current: Option<Arc<TrainedModel>>,
    installs: u64,
}

/// Owner of the served model: Untrained until the first install, Ready after
#[derive(Clone)]
pub struct ModelLifecycle {
    slot: Arc<RwLock<Slot>>,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ModelLifecycle {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot::default())),
            metrics: ServiceMetrics::new(),
            logger,
        }
    }

    /// Publish a model, replacing any previous one. Returns the assigned version.
    pub fn install(&self, mut model: TrainedModel) -> String {
        let (installed, previous) = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.installs += 1;
            model.version = format!("v{}", slot.installs);
            let installed = Arc::new(model);
            let previous = slot.current.replace(installed.clone());
            (installed, previous)
        };

        self.metrics
            .set_model_info(installed.version(), installed.fingerprint());
        self.logger.log_model_installed(
            previous.as_ref().map(|m| m.version()),
            installed.version(),
            installed.fingerprint(),
            installed.training_rows(),
        );

        installed.version().to_string()
    }

    /// The current model, held by the caller for the rest of its request
    pub fn snapshot(&self) -> Result<Arc<TrainedModel>, ModelNotReady> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
            .ok_or(ModelNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_ok()
    }

    pub fn current_version(&self) -> Option<String> {
        self.snapshot().ok().map(|m| m.version().to_string())
    }

    /// Build the training set from raw rows and fit a model on it
    pub fn train(&self, rows: &[RawRow], trainer: &dyn Trainer) -> Result<TrainedModel> {
        let set = build_dataset(rows)?;
        self.logger
            .log_dataset_built(set.len(), set.dropped_rows(), set.profile().width());
        self.fit(set, trainer)
    }

    /// Fit a model on an already built training set, recording the run.
    ///
    /// Does not install the result.
    pub fn fit(&self, set: TrainingSet, trainer: &dyn Trainer) -> Result<TrainedModel> {
        let start = Instant::now();
        let outcome = trainer.train(&set)?;
        let elapsed = start.elapsed().as_secs_f64();

        self.metrics
            .record_training(elapsed, set.len(), set.dropped_rows());
        self.logger
            .log_training_complete(set.len(), outcome.loss, elapsed);

        let training_rows = set.len();
        TrainedModel::new(
            outcome.predictor,
            set.into_profile(),
            training_rows,
            outcome.loss,
        )
    }

    /// Train a replacement from scratch and swap it in once complete.
    ///
    /// The current model keeps serving while training runs; on failure it
    /// stays installed.
    pub fn retrain(&self, rows: &[RawRow], trainer: &dyn Trainer) -> Result<String> {
        let model = self.train(rows, trainer)?;
        Ok(self.install(model))
    }
}
