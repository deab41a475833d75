//! Core library for crop yield prediction
//!
//! This crate provides:
//! - CSV dataset loading
//! - Schema profiling and row encoding shared by training and serving
//! - Model training and the trained-model lifecycle
//! - The prediction service used by the HTTP layer
//! - Health checks and observability

pub mod error;
pub mod features;
pub mod health;
pub mod loader;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use error::{DataLoadError, EncodingError, ModelNotReady, PredictError, SchemaError};
pub use features::{build_dataset, encode, SchemaProfile, TrainingSet};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use loader::{load_csv, read_rows};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{
    DenseTrainer, ModelLifecycle, Prediction, PredictionResponse, Predictor, TrainOutcome,
    TrainedModel, Trainer, TrainerConfig,
};
pub use service::{PredictRequest, PredictionService};
