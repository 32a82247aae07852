//! Process-wide classifier service
//!
//! Owns the single active model. Training builds a complete model off to
//! the side, persists it, and publishes it with one pointer swap; readers
//! clone the `Arc` under a short read lock and never block each other.

use super::{BatchPrediction, InferenceEngine, Prediction, PREDICTION_COLUMN};
use crate::config::ClassifierConfig;
use crate::error::{Result, StressError};
use crate::export::{ModelSnapshot, SnapshotInfo};
use crate::preprocessing::{records_from_dataframe, CleanedDataset, RawRecord};
use crate::training::{HoldoutEvaluation, MetricsReport, TrainEngine};
use crate::utils::DataLoader;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Lifecycle state of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Untrained,
    Trained,
}

/// Published model with its evaluation, when one exists
#[derive(Debug)]
struct ActiveModel {
    engine: InferenceEngine,
    metrics: Option<MetricsReport>,
    evaluation: Option<HoldoutEvaluation>,
}

/// Train, persist and serve the stress classifier
pub struct ClassifierService {
    config: ClassifierConfig,
    loader: DataLoader,
    trainer: TrainEngine,
    active: RwLock<Option<Arc<ActiveModel>>>,
}

impl std::fmt::Debug for ClassifierService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierService")
            .field("dataset", &self.config.dataset)
            .field("model_path", &self.config.model_path)
            .field("state", &self.state())
            .finish()
    }
}

impl ClassifierService {
    /// Create an untrained service
    pub fn new(config: ClassifierConfig) -> Self {
        let loader =
            DataLoader::new().with_fetch_timeout(Duration::from_secs(config.fetch_timeout_secs));
        let trainer = TrainEngine::new(config.training.clone());

        Self {
            config,
            loader,
            trainer,
            active: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> ModelState {
        if self.active.read().is_some() {
            ModelState::Trained
        } else {
            ModelState::Untrained
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Trained
    }

    fn current(&self) -> Result<Arc<ActiveModel>> {
        self.active.read().clone().ok_or(StressError::ModelNotReady)
    }

    fn publish(&self, model: ActiveModel) {
        *self.active.write() = Some(Arc::new(model));
    }

    /// Load and clean the configured dataset
    pub fn load_dataset(&self) -> Result<CleanedDataset> {
        self.loader
            .load_and_clean(&self.config.dataset, &self.config.training)
    }

    /// Full training run on the configured dataset
    pub fn train(&self) -> Result<MetricsReport> {
        let dataset = self.load_dataset().map_err(|e| {
            warn!(error = %e, "Training aborted, keeping the current model");
            e
        })?;
        self.train_on(&dataset)
    }

    /// Train on an already cleaned dataset, save the snapshot, then publish.
    /// On any failure the previously published model stays active.
    pub fn train_on(&self, dataset: &CleanedDataset) -> Result<MetricsReport> {
        let start = Instant::now();

        let result = self.trainer.fit(dataset).and_then(|outcome| {
            let snapshot = ModelSnapshot::new(outcome.model);
            snapshot.save(&self.config.model_path)?;
            Ok((snapshot.model, outcome.evaluation, outcome.metrics))
        });

        let (model, evaluation, metrics) = result.map_err(|e| {
            warn!(error = %e, "Training failed, keeping the current model");
            e
        })?;

        self.publish(ActiveModel {
            engine: InferenceEngine::new(Arc::new(model), self.config.inference.clone()),
            metrics: Some(metrics.clone()),
            evaluation: Some(evaluation),
        });

        info!(
            accuracy = metrics.accuracy,
            path = %self.config.model_path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model published"
        );
        Ok(metrics)
    }

    /// Train and evaluate without saving or publishing anything
    pub fn evaluate(&self) -> Result<MetricsReport> {
        let dataset = self.load_dataset()?;
        Ok(self.trainer.fit(&dataset)?.metrics)
    }

    /// Load the snapshot at the configured path and publish it.
    /// Metrics stay unavailable since held-out data is not persisted.
    pub fn load_snapshot(&self) -> Result<SnapshotInfo> {
        let snapshot = ModelSnapshot::load(&self.config.model_path)?;
        let info = snapshot.info();

        self.publish(ActiveModel {
            engine: InferenceEngine::new(Arc::new(snapshot.model), self.config.inference.clone()),
            metrics: None,
            evaluation: None,
        });

        info!(
            path = %self.config.model_path.display(),
            trained_at = %info.trained_at,
            features = info.feature_names.len(),
            "Model snapshot loaded"
        );
        Ok(info)
    }

    /// Predict the stress rating of one record
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        self.current()?.engine.predict(record)
    }

    /// Class probabilities of one record, in class order
    pub fn predict_probability(&self, record: &RawRecord) -> Result<Vec<f64>> {
        Ok(self.predict(record)?.probabilities)
    }

    /// Predict many records at once
    pub fn predict_batch(&self, rows: &[RawRecord]) -> Result<Vec<i64>> {
        self.current()?.engine.predict_batch(rows)
    }

    /// Predict every row of an uploaded CSV
    pub fn predict_csv(&self, bytes: &[u8]) -> Result<BatchPrediction> {
        let active = self.current()?;

        let df = self.loader.load_csv_bytes(bytes).map_err(|e| match e {
            StressError::DataUnavailable(msg) => StressError::InvalidInput(msg),
            other => other,
        })?;
        let records = records_from_dataframe(&df)?;
        let predictions = active.engine.predict_batch(&records)?;

        let preview = records
            .into_iter()
            .zip(&predictions)
            .take(active.engine.config().preview_rows)
            .map(|(mut record, &class)| {
                record.insert(PREDICTION_COLUMN.to_string(), Value::from(class));
                record
            })
            .collect();

        info!(rows = predictions.len(), "CSV batch predicted");
        Ok(BatchPrediction {
            total_predictions: predictions.len(),
            predictions,
            preview,
        })
    }

    /// Held-out metrics of the model trained in this process
    pub fn metrics(&self) -> Option<MetricsReport> {
        self.active.read().as_ref().and_then(|m| m.metrics.clone())
    }

    /// Held-out rows and predictions of the model trained in this process
    pub fn evaluation(&self) -> Option<HoldoutEvaluation> {
        self.active.read().as_ref().and_then(|m| m.evaluation.clone())
    }

    /// Feature names in training order; empty when untrained
    pub fn feature_schema(&self) -> Vec<String> {
        self.current()
            .map(|m| m.engine.model().feature_names.clone())
            .unwrap_or_default()
    }

    /// Known categories of a feature; empty for numeric features or when untrained
    pub fn category_values(&self, feature: &str) -> Vec<String> {
        self.current()
            .map(|m| m.engine.model().encoders.categories(feature))
            .unwrap_or_default()
    }

    pub fn snapshot_info(&self) -> Option<SnapshotInfo> {
        self.current()
            .ok()
            .map(|m| SnapshotInfo::from(m.engine.model()))
    }
}
