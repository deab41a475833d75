//! Integration tests for the server API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use yield_core::{
    health::components, read_rows, FeatureVector, HealthRegistry, ModelLifecycle,
    PredictionService, Predictor, ServiceMetrics, StructuredLogger, TrainOutcome, Trainer,
    TrainingSet,
};
use yield_server::api::{create_router, AppState};

const TRAINING_CSV: &str = "\
Crop_Type,Rainfall,Yield
Wheat,10,5
Corn,20,8
";

/// Dot product with fixed weights: Wheat 1, Corn 2, Rainfall 10
struct WeightedPredictor;

impl Predictor for WeightedPredictor {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<f32> {
        Ok(features
            .as_slice()
            .iter()
            .zip([1.0f32, 2.0, 10.0])
            .map(|(f, w)| f * w)
            .sum())
    }

    fn input_width(&self) -> usize {
        3
    }
}

struct FixedTrainer;

impl Trainer for FixedTrainer {
    fn train(&self, _set: &TrainingSet) -> anyhow::Result<TrainOutcome> {
        Ok(TrainOutcome {
            predictor: Box::new(WeightedPredictor),
            loss: 0.25,
        })
    }
}

async fn setup_test_app(trained: bool) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATASET).await;
    health_registry.register(components::PREDICTOR).await;

    let logger = StructuredLogger::new("test");
    let metrics = ServiceMetrics::new();
    let lifecycle = ModelLifecycle::new(logger.clone());
    if trained {
        let rows = read_rows(TRAINING_CSV.as_bytes()).unwrap();
        lifecycle.retrain(&rows, &FixedTrainer).unwrap();
    }

    let service = PredictionService::new(lifecycle, metrics.clone(), logger);
    let state = Arc::new(AppState::new(health_registry, metrics, service));
    (create_router(state.clone()), state)
}

fn post_predict(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_predict_returns_503_before_training() {
    let (app, _state) = setup_test_app(false).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Corn", "Rainfall": "20"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ModelNotReadyError");
}

#[tokio::test]
async fn test_predict_returns_rounded_yield() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Corn", "Rainfall": "20"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["predictedYield"], "12.00");
    assert_eq!(body["modelVersion"], "v1");
}

#[tokio::test]
async fn test_predict_unknown_category_is_not_an_error() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Millet", "Rainfall": 15}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["predictedYield"], "5.00");
}

#[tokio::test]
async fn test_predict_missing_field_returns_400() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Corn"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ValidationError");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Rainfall"));
    assert!(body.get("predictedYield").is_none());
}

#[tokio::test]
async fn test_predict_pre_encoded_vector_rejected() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": [0.0, 1.0, 1.0]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ValidationError");
}

#[tokio::test]
async fn test_predict_non_numeric_returns_encoding_error() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(
            r#"{"inputs": {"Crop_Type": "Corn", "Rainfall": "a lot"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "EncodingError");
}

#[tokio::test]
async fn test_predict_overflowing_number_returns_400() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Corn", "Rainfall": 1e300}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "EncodingError");
}

#[tokio::test]
async fn test_predict_malformed_json_returns_400() {
    let (app, _state) = setup_test_app(true).await;

    let response = app.oneshot(post_predict("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ValidationError");
}

#[tokio::test]
async fn test_model_info() {
    let (app, _state) = setup_test_app(false).await;
    let response = app.oneshot(get("/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let (app, _state) = setup_test_app(true).await;
    let response = app.oneshot(get("/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["version"], "v1");
    assert_eq!(body["trainingRows"], 2);
    assert_eq!(
        body["profile"]["feature_order"],
        serde_json::json!(["Crop_Type_Wheat", "Crop_Type_Corn", "Rainfall"])
    );
    assert_eq!(body["profile"]["categories"], serde_json::json!(["Wheat", "Corn"]));
    assert_eq!(body["profileFingerprint"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_readyz_tracks_lifecycle() {
    let (app, state) = setup_test_app(false).await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let rows = read_rows(TRAINING_CSV.as_bytes()).unwrap();
    state
        .lifecycle()
        .retrain(&rows, &FixedTrainer)
        .unwrap();

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["model_version"], "v1");
}

#[tokio::test]
async fn test_healthz_reports_degraded_as_ok() {
    let (app, state) = setup_test_app(true).await;
    state
        .health_registry
        .set_degraded(components::DATASET, "2 incomplete rows excluded")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app(true).await;
    state
        .health_registry
        .set_unhealthy(components::PREDICTOR, "inference failing")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app(true).await;

    let response = app
        .clone()
        .oneshot(post_predict(r#"{"inputs": {"Crop_Type": "Wheat", "Rainfall": "10"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("yield_predictions_served_total"));
}

#[tokio::test]
async fn test_index_page() {
    let (app, _state) = setup_test_app(false).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/predict"));
}
