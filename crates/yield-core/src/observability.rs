//! Observability infrastructure for the yield service
//!
//! Provides:
//! - Prometheus metrics (training duration, prediction latency, outcomes, model info)
//! - Structured JSON event logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Gauge, Histogram, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

static GLOBAL_METRICS: OnceLock<MetricsInner> = OnceLock::new();

struct MetricsInner {
    training_duration_seconds: Gauge,
    training_rows: IntGauge,
    training_dropped_rows: IntGauge,
    prediction_latency_seconds: Histogram,
    predictions_served: IntCounter,
    prediction_errors: IntCounterVec,
    model_info: IntGaugeVec,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            training_duration_seconds: register_gauge!(
                "yield_training_duration_seconds",
                "Wall time of the last completed training run"
            )
            .expect("Failed to register training_duration_seconds"),

            training_rows: register_int_gauge!(
                "yield_training_rows",
                "Rows used to train the current model"
            )
            .expect("Failed to register training_rows"),

            training_dropped_rows: register_int_gauge!(
                "yield_training_dropped_rows",
                "Incomplete rows excluded from the last training set"
            )
            .expect("Failed to register training_dropped_rows"),

            prediction_latency_seconds: register_histogram!(
                "yield_prediction_latency_seconds",
                "Time spent validating, encoding and scoring a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter!(
                "yield_predictions_served_total",
                "Predictions returned successfully"
            )
            .expect("Failed to register predictions_served"),

            prediction_errors: register_int_counter_vec!(
                "yield_prediction_errors_total",
                "Rejected prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors"),

            model_info: register_int_gauge_vec!(
                "yield_model_info",
                "Currently installed model",
                &["version", "profile_fingerprint"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide metrics. Clones share the same collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MetricsInner {
        GLOBAL_METRICS.get_or_init(MetricsInner::new)
    }

    pub fn record_training(&self, duration_secs: f64, rows: usize, dropped_rows: usize) {
        self.inner().training_duration_seconds.set(duration_secs);
        self.inner().training_rows.set(rows as i64);
        self.inner().training_dropped_rows.set(dropped_rows as i64);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    /// Replace the model info series with the newly installed model
    pub fn set_model_info(&self, version: &str, fingerprint: &str) {
        let short = &fingerprint[..fingerprint.len().min(12)];
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, short])
            .set(1);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, data_path: &str, port: u16) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            data_path = %data_path,
            port = port,
            "Yield service starting"
        );
    }

    pub fn log_dataset_built(&self, rows: usize, dropped_rows: usize, features: usize) {
        if dropped_rows > 0 {
            warn!(
                event = "dataset_built",
                instance = %self.instance,
                rows = rows,
                dropped_rows = dropped_rows,
                features = features,
                "Incomplete rows excluded from training set"
            );
        } else {
            info!(
                event = "dataset_built",
                instance = %self.instance,
                rows = rows,
                dropped_rows = 0,
                features = features,
                "Training set built"
            );
        }
    }

    pub fn log_training_complete(&self, rows: usize, loss: f32, duration_secs: f64) {
        info!(
            event = "training_complete",
            instance = %self.instance,
            rows = rows,
            loss = loss,
            duration_secs = duration_secs,
            "Model training complete"
        );
    }

    pub fn log_model_installed(
        &self,
        previous_version: Option<&str>,
        version: &str,
        fingerprint: &str,
        training_rows: usize,
    ) {
        info!(
            event = "model_installed",
            instance = %self.instance,
            previous_version = ?previous_version,
            version = %version,
            profile_fingerprint = %fingerprint,
            training_rows = training_rows,
            "Model installed"
        );
    }

    pub fn log_prediction(&self, model_version: &str, value: f32, latency_us: u128) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            model_version = %model_version,
            predicted_yield = value,
            latency_us = latency_us as u64,
            "Prediction served"
        );
    }

    pub fn log_prediction_rejected(&self, kind: &str, message: &str) {
        warn!(
            event = "prediction_rejected",
            instance = %self.instance,
            kind = %kind,
            message = %message,
            "Prediction request rejected"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Yield service shutting down"
        );
    }
}
