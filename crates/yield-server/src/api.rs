//! HTTP API: prediction, model introspection, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use yield_core::{
    ComponentStatus, HealthRegistry, ModelLifecycle, PredictError, PredictRequest,
    PredictionResponse, PredictionService, SchemaProfile, ServiceMetrics,
};

const INDEX_PAGE: &str = include_str!("index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub service: PredictionService,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        service: PredictionService,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            service,
        }
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        self.service.lifecycle()
    }
}

/// Prediction failure rendered as `{"error": {"kind", "message"}}`
pub struct ApiError(pub PredictError);

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PredictError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::Validation(_) | PredictError::Encoding(_) => StatusCode::BAD_REQUEST,
            PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        let err = PredictError::Validation(rejection.body_text());
        state.metrics.inc_prediction_errors(err.kind());
        err
    })?;

    let prediction = state.service.predict(&request)?;
    Ok(Json(prediction.to_response()))
}

/// Installed model summary for `GET /model`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo<'a> {
    version: &'a str,
    trained_at: i64,
    training_rows: usize,
    training_loss: f32,
    profile_fingerprint: &'a str,
    profile: &'a SchemaProfile,
}

async fn model_info(State(state): State<Arc<AppState>>) -> Response {
    match state.lifecycle().snapshot() {
        Ok(model) => Json(ModelInfo {
            version: model.version(),
            trained_at: model.trained_at(),
            training_rows: model.training_rows(),
            training_loss: model.training_loss(),
            profile_fingerprint: model.fingerprint(),
            profile: model.profile(),
        })
        .into_response(),
        Err(not_ready) => ApiError(not_ready.into()).into_response(),
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once a model is installed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state
        .health_registry
        .readiness(state.lifecycle().current_version())
        .await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
