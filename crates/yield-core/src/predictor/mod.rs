//! Model training and prediction
//!
//! The pipeline only sees models through the [`Trainer`] and [`Predictor`]
//! traits. [`DenseTrainer`] is the default implementation.

mod lifecycle;
mod network;
mod output;

pub use lifecycle::{ModelLifecycle, TrainedModel};
pub use network::{
    DenseNetwork, DenseTrainer, TrainerConfig, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS,
    DEFAULT_HIDDEN_LAYERS, DEFAULT_LEARNING_RATE,
};
pub use output::{format_yield, Prediction, PredictionResponse, DISPLAY_DECIMALS};

use crate::features::TrainingSet;
use crate::models::FeatureVector;
use anyhow::Result;

/// A trained model mapping a feature vector to a yield estimate
pub trait Predictor: Send + Sync {
    /// Predict from a feature vector of exactly [`Predictor::input_width`] values
    fn predict(&self, features: &FeatureVector) -> Result<f32>;

    /// Number of features the model was trained on
    fn input_width(&self) -> usize;
}

/// Result of a training run
pub struct TrainOutcome {
    pub predictor: Box<dyn Predictor>,
    /// Mean squared error over the final epoch
    pub loss: f32,
}

/// Fits a predictor to an encoded training set
pub trait Trainer: Send + Sync {
    fn train(&self, set: &TrainingSet) -> Result<TrainOutcome>;
}
