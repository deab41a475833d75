//! Prediction service
//!
//! Validates raw-domain inference requests, encodes them with the installed
//! model's own schema profile and scores them. Independent of the HTTP layer.

use crate::error::PredictError;
use crate::features::SchemaProfile;
use crate::models::RawRow;
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{ModelLifecycle, Prediction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Request body for `POST /predict`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Raw column values keyed like the training CSV header
    #[serde(default)]
    pub inputs: Option<Value>,
}

impl PredictRequest {
    pub fn new(inputs: Value) -> Self {
        Self {
            inputs: Some(inputs),
        }
    }
}

#[derive(Clone)]
pub struct PredictionService {
    lifecycle: ModelLifecycle,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(lifecycle: ModelLifecycle, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        Self {
            lifecycle,
            metrics,
            logger,
        }
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    /// Score one request against the model installed at call time
    pub fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictError> {
        let start = Instant::now();
        let result = self.score(request);
        let elapsed = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions_served();
                self.logger.log_prediction(
                    &prediction.model_version,
                    prediction.value,
                    elapsed.as_micros(),
                );
            }
            Err(err) => {
                self.metrics.inc_prediction_errors(err.kind());
                self.logger
                    .log_prediction_rejected(err.kind(), &err.to_string());
            }
        }

        result
    }

    fn score(&self, request: &PredictRequest) -> Result<Prediction, PredictError> {
        let model = self.lifecycle.snapshot()?;
        let row = validate_inputs(request.inputs.as_ref(), model.profile())?;
        let features = model.profile().encode(&row)?;

        let value = model
            .predict(&features)
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        if !value.is_finite() {
            return Err(PredictError::Inference(format!(
                "model produced a non-finite value ({value})"
            )));
        }

        Ok(Prediction {
            value,
            model_version: model.version().to_string(),
        })
    }
}

/// Check the request carries every raw column the profile encodes.
///
/// Values may be JSON strings or numbers. Unknown keys, including `Yield`,
/// are ignored.
pub fn validate_inputs(inputs: Option<&Value>, profile: &SchemaProfile) -> Result<RawRow, PredictError> {
    let inputs = inputs.ok_or_else(|| {
        PredictError::Validation("request body must contain an 'inputs' object".to_string())
    })?;
    let fields = inputs
        .as_object()
        .ok_or_else(|| PredictError::Validation("'inputs' must be a JSON object".to_string()))?;

    let mut row = RawRow::new();
    let mut missing = Vec::new();

    for column in profile.input_columns() {
        let value = match fields.get(column) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                return Err(PredictError::Validation(format!(
                    "field '{column}' must be a string or number"
                )))
            }
        };

        match value {
            Some(v) if !v.is_empty() => row.insert(column, v),
            _ => missing.push(column),
        }
    }

    if !missing.is_empty() {
        return Err(PredictError::Validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    Ok(row)
}
