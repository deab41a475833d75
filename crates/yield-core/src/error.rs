//! Error taxonomy for the yield pipeline
//!
//! Load and schema errors are fatal at startup. Encoding, validation and
//! lifecycle errors are per-request and are mapped to HTTP responses by the
//! server.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read the raw dataset
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Malformed(#[from] csv::Error),
}

/// A raw value that could not be turned into a feature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("missing value for column '{0}'")]
    MissingField(String),

    #[error("column '{column}' has non-numeric value '{value}'")]
    InvalidNumeric { column: String, value: String },
}

/// The dataset cannot produce a schema profile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dataset contains no valid rows")]
    EmptyDataset,

    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("numeric column '{0}' spans a range too wide to normalize")]
    UnboundedRange(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// No model has been installed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("model is not trained yet")]
pub struct ModelNotReady;

/// Per-request prediction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("model is not trained yet")]
    ModelNotReady,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ModelNotReady => "ModelNotReadyError",
            PredictError::Validation(_) => "ValidationError",
            PredictError::Encoding(_) => "EncodingError",
            PredictError::Inference(_) => "InferenceError",
        }
    }
}

impl From<ModelNotReady> for PredictError {
    fn from(_: ModelNotReady) -> Self {
        PredictError::ModelNotReady
    }
}
