//! Feature engineering
//!
//! This module provides:
//! - Schema profiling (category vocabulary, numeric ranges, feature order)
//! - Row encoding shared by the training and serving paths
//! - Training set assembly with completeness filtering

mod dataset;
mod encoder;
mod profile;

pub use dataset::{build_dataset, TrainingSet};
pub use encoder::encode;
pub use profile::{NumericColumn, SchemaProfile};
