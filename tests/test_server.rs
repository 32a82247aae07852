//! Integration test: Server API endpoints

mod common;

use academic_stress::inference::ClassifierService;
use academic_stress::server::{create_router, AppState, ServerConfig};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_upload_size: 1024 * 1024,
    }
}

fn app_with(service: ClassifierService) -> axum::Router {
    let config = test_config();
    let state = Arc::new(AppState::new(config.clone(), Arc::new(service)));
    create_router(state, &config)
}

fn test_app(dir: &Path) -> axum::Router {
    app_with(common::survey_service(dir))
}

fn trained_app(dir: &Path) -> axum::Router {
    let service = common::survey_service(dir);
    service.train().unwrap();
    app_with(service)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(test_app(dir.path()), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_metrics_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(test_app(dir.path()), get("/api/metrics")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Model not trained");
}

#[tokio::test]
async fn test_predict_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = send(
        test_app(dir.path()),
        post_json("/api/predict", Value::Object(common::sample_record())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_train_then_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/train")
        .body(Body::empty())
        .unwrap();
    let (status, trained) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(trained["accuracy"].as_f64().unwrap() > 0.0);

    let (status, metrics) = send(app.clone(), get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["accuracy"], trained["accuracy"]);
    assert_eq!(metrics["classes"].as_array().unwrap().len(), 5);

    let (_, health) = send(app, get("/api/health")).await;
    assert_eq!(health["ready"], true);
}

#[tokio::test]
async fn test_train_without_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let service = ClassifierService::new(
        academic_stress::config::ClassifierConfig::default()
            .with_dataset(academic_stress::utils::DatasetSource::File(dir.path().join("none.csv")))
            .with_model_path(dir.path().join("model.bin")),
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/train")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app_with(service), request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_schema_lists_features() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(trained_app(dir.path()), get("/api/schema")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 7);
    let environment = features
        .iter()
        .find(|f| f["name"] == "Study Environment")
        .unwrap();
    assert_eq!(environment["type"], "categorical");
    assert_eq!(environment["categories"], json!(["Noisy", "Peaceful", "disrupted"]));

    let peer = features.iter().find(|f| f["name"] == "Peer pressure").unwrap();
    assert_eq!(peer["type"], "numeric");
}

#[tokio::test]
async fn test_model_info() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(trained_app(dir.path()), get("/api/model")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"]["classes"], json!([1, 2, 3, 4, 5]));
    assert_eq!(body["metrics_available"], true);
}

#[tokio::test]
async fn test_predict_single() {
    let dir = tempfile::tempdir().unwrap();
    let mut record = common::sample_record();
    record.insert("Study Environment".to_string(), json!("Library"));

    let (status, body) = send(
        trained_app(dir.path()),
        post_json("/api/predict", Value::Object(record)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let prediction = body["prediction"].as_i64().unwrap();
    assert!((1..=5).contains(&prediction));
    assert_eq!(body["probabilities"].as_array().unwrap().len(), 5);
    assert_eq!(body["warnings"][0]["kind"], "unseen_category");
    assert_eq!(body["warnings"][0]["feature"], "Study Environment");
}

#[tokio::test]
async fn test_predict_rejects_non_object() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(trained_app(dir.path()), post_json("/api/predict", json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_predict_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rows = json!([common::sample_record(), common::sample_record()]);
    let (status, body) = send(trained_app(dir.path()), post_json("/api/predict/batch", rows)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["predictions"][0], body["predictions"][1]);
}

#[tokio::test]
async fn test_predict_csv() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict/csv")
        .header("content-type", "text/csv")
        .body(Body::from(common::survey_csv()))
        .unwrap();
    let (status, body) = send(trained_app(dir.path()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_predictions"], common::SURVEY_ROWS);
    assert_eq!(body["results"].as_array().unwrap().len(), 50);
    assert!(body["results"][0]["Predicted_Stress_Level"].is_number());
}

#[tokio::test]
async fn test_predict_csv_empty_body() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict/csv")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(trained_app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(test_app(dir.path()), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_wrong_method() {
    let dir = tempfile::tempdir().unwrap();
    let (status, _) = send(test_app(dir.path()), get("/api/train")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_predict_batch_rejects_object_body() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(
        trained_app(dir.path()),
        post_json("/api/predict/batch", json!({"not": "an array"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_predict_batch_rejects_non_object_row() {
    let dir = tempfile::tempdir().unwrap();
    let rows = json!([common::sample_record(), 3]);
    let (status, body) = send(trained_app(dir.path()), post_json("/api/predict/batch", rows)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Row 1 is not a JSON object");
}

#[tokio::test]
async fn test_malformed_json_gets_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"Peer pressure\": "))
        .unwrap();
    let (status, body) = send(trained_app(dir.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}
