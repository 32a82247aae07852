//! HTTP request handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::StressError;
use crate::inference::InferenceDiagnostic;
use crate::preprocessing::RawRecord;
use crate::training::MetricsReport;

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ready": state.service.is_ready(),
        "state": state.service.state(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

// ============================================================================
// Training
// ============================================================================

/// Run a full training cycle on a blocking worker
pub async fn train_model(State(state): State<Arc<AppState>>) -> Result<Json<MetricsReport>> {
    let service = Arc::clone(&state.service);
    info!("Training requested");

    let metrics = tokio::task::spawn_blocking(move || service.train())
        .await
        .map_err(|e| ServerError::Internal(format!("training task failed: {}", e)))??;

    Ok(Json(metrics))
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Json<MetricsReport>> {
    if !state.service.is_ready() {
        return Err(StressError::ModelNotReady.into());
    }
    state.service.metrics().map(Json).ok_or_else(|| {
        ServerError::NotFound(
            "No evaluation available for a model loaded from a snapshot; retrain to compute metrics"
                .to_string(),
        )
    })
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub categories: Vec<String>,
}

/// Features in schema order with their known categories
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    let service = &state.service;
    let features: Vec<FeatureDescription> = service
        .feature_schema()
        .into_iter()
        .map(|name| {
            let categories = service.category_values(&name);
            let kind = if categories.is_empty() { "numeric" } else { "categorical" };
            FeatureDescription {
                name,
                kind: kind.to_string(),
                categories,
            }
        })
        .collect();

    Json(json!({
        "ready": service.is_ready(),
        "features": features,
    }))
}

pub async fn get_model_info(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let info = state
        .service
        .snapshot_info()
        .ok_or(StressError::ModelNotReady)?;
    Ok(Json(json!({
        "model": info,
        "metrics_available": state.service.metrics().is_some(),
    })))
}

// ============================================================================
// Inference
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: i64,
    /// Probability of the predicted class
    pub probability: f64,
    pub probabilities: Vec<f64>,
    pub warnings: Vec<InferenceDiagnostic>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(payload) = payload?;
    let Value::Object(record) = payload else {
        return Err(ServerError::BadRequest("Expected a JSON object of feature values".to_string()));
    };

    let prediction = state.service.predict(&record)?;
    Ok(Json(PredictResponse {
        prediction: prediction.class,
        probability: prediction.confidence(),
        probabilities: prediction.probabilities,
        warnings: prediction.diagnostics,
    }))
}

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload?;
    let rows = batch_records(payload)?;
    let predictions = state.service.predict_batch(&rows)?;
    Ok(Json(json!({
        "count": predictions.len(),
        "predictions": predictions,
    })))
}

/// Predict every row of a CSV sent as the raw request body
pub async fn predict_csv(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>> {
    if body.is_empty() {
        return Err(ServerError::BadRequest("No CSV content received".to_string()));
    }
    info!(bytes = body.len(), "CSV batch received");

    let service = Arc::clone(&state.service);
    let batch = tokio::task::spawn_blocking(move || service.predict_csv(&body))
        .await
        .map_err(|e| ServerError::Internal(format!("CSV prediction task failed: {}", e)))??;
    Ok(Json(json!({
        "total_predictions": batch.total_predictions,
        "results": batch.preview,
    })))
}

/// Rows of a batch request: a JSON array of objects
fn batch_records(payload: Value) -> Result<Vec<RawRecord>> {
    let Value::Array(items) = payload else {
        return Err(ServerError::BadRequest(
            "Expected a JSON array of feature objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(ServerError::BadRequest(format!("Row {} is not a JSON object", i))),
        })
        .collect()
}
