//! Inference engine implementation
//!
//! Coerces raw records to the training schema and predicts with the
//! shared model. Batch prediction encodes rows in parallel chunks into one
//! matrix before handing it to the tree.

use super::{InferenceConfig, InferenceDiagnostic, Prediction};
use crate::error::{Result, StressError};
use crate::preprocessing::RawRecord;
use crate::training::decision_tree::argmax;
use crate::training::{to_external, ClassifierModel};
use ndarray::Array2;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Feature vector in schema order plus the fallbacks applied to build it
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub features: Vec<f64>,
    pub diagnostics: Vec<InferenceDiagnostic>,
}

/// Inference engine over a shared trained model
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    config: InferenceConfig,
    model: Arc<ClassifierModel>,
}

impl InferenceEngine {
    /// Create a new inference engine
    pub fn new(model: Arc<ClassifierModel>, config: InferenceConfig) -> Self {
        Self { config, model }
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Encode a record in schema order; extra keys are ignored
    pub fn prepare(&self, record: &RawRecord) -> PreparedRecord {
        let model = &self.model;
        let mut features = Vec::with_capacity(model.feature_names.len());
        let mut diagnostics = Vec::new();

        for name in &model.feature_names {
            let value = record.get(name).filter(|v| !v.is_null());
            let (encoded, diagnostic) = match value {
                None => (
                    0.0,
                    Some(InferenceDiagnostic::MissingFeature {
                        feature: name.clone(),
                    }),
                ),
                Some(value) if model.encoders.is_categorical(name) => {
                    let category = category_text(value);
                    match model.encoders.encode(name, &category) {
                        Some(code) => (code as f64, None),
                        None => (
                            0.0,
                            Some(InferenceDiagnostic::UnseenCategory {
                                feature: name.clone(),
                                value: category,
                            }),
                        ),
                    }
                }
                Some(value) => match numeric_value(value) {
                    Some(x) => (x, None),
                    None => (
                        0.0,
                        Some(InferenceDiagnostic::InvalidNumber {
                            feature: name.clone(),
                            value: category_text(value),
                        }),
                    ),
                },
            };

            features.push(encoded);
            if let Some(diagnostic) = diagnostic {
                if self.config.log_diagnostics {
                    warn!(feature = %diagnostic.feature(), "{}", diagnostic);
                }
                diagnostics.push(diagnostic);
            }
        }

        PreparedRecord {
            features,
            diagnostics,
        }
    }

    /// Predict one record
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        let prepared = self.prepare(record);
        let x = Array2::from_shape_vec((1, prepared.features.len()), prepared.features)
            .map_err(|e| StressError::InvalidInput(e.to_string()))?;

        let proba = self.model.tree.predict_proba(&x)?;
        let probabilities = proba.row(0).to_vec();
        let class = self.external_class(argmax(&probabilities))?;

        Ok(Prediction {
            class,
            probabilities,
            diagnostics: prepared.diagnostics,
        })
    }

    /// Predict many records; the i-th rating matches `predict(&rows[i]).class`
    pub fn predict_batch(&self, rows: &[RawRecord]) -> Result<Vec<i64>> {
        let n_features = self.model.feature_names.len();
        let chunk = self.config.batch_size.max(1);

        let flat: Vec<f64> = rows
            .par_chunks(chunk)
            .flat_map_iter(|chunk| {
                chunk
                    .iter()
                    .flat_map(|row| self.prepare(row).features)
                    .collect::<Vec<_>>()
            })
            .collect();

        let x = Array2::from_shape_vec((rows.len(), n_features), flat)
            .map_err(|e| StressError::InvalidInput(e.to_string()))?;

        self.model
            .tree
            .predict(&x)?
            .iter()
            .map(|&k| self.external_class(k))
            .collect()
    }

    fn external_class(&self, index: usize) -> Result<i64> {
        self.model
            .target_classes
            .get(index)
            .map(|&c| to_external(c))
            .ok_or_else(|| {
                StressError::CorruptSnapshot(format!("tree predicted unknown class index {}", index))
            })
    }
}

/// Text of a value used as a category
fn category_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers, numeric strings and booleans; anything else is not a number
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{CleanedDataset, DatasetColumn};
    use crate::training::{TrainEngine, TrainingConfig};
    use serde_json::json;

    fn engine() -> InferenceEngine {
        let n = 40;
        let peer: Vec<f64> = (0..n).map(|i| (i % 4 + 1) as f64).collect();
        let env: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Noisy" } else { "Peaceful" }).collect();

        let dataset = CleanedDataset::from_columns(vec![
            DatasetColumn::categorical("Study Environment", env),
            DatasetColumn::numeric("Peer pressure", peer.clone()),
            DatasetColumn::numeric("stress", peer),
        ])
        .unwrap();

        let outcome = TrainEngine::new(TrainingConfig::new("stress"))
            .fit(&dataset)
            .unwrap();
        InferenceEngine::new(Arc::new(outcome.model), InferenceConfig::default())
    }

    fn record(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_prepare_schema_order() {
        let engine = engine();
        let prepared = engine.prepare(&record(json!({
            "Peer pressure": 3,
            "Study Environment": "Peaceful",
            "ignored": "x"
        })));

        assert_eq!(prepared.features, vec![1.0, 3.0]);
        assert!(prepared.diagnostics.is_empty());
    }

    #[test]
    fn test_prepare_fallbacks() {
        let engine = engine();
        let prepared = engine.prepare(&record(json!({
            "Peer pressure": "lots",
            "Study Environment": "On the moon"
        })));

        assert_eq!(prepared.features, vec![0.0, 0.0]);
        assert_eq!(
            prepared.diagnostics,
            vec![
                InferenceDiagnostic::UnseenCategory {
                    feature: "Study Environment".to_string(),
                    value: "On the moon".to_string()
                },
                InferenceDiagnostic::InvalidNumber {
                    feature: "Peer pressure".to_string(),
                    value: "lots".to_string()
                },
            ]
        );

        let empty = engine.prepare(&RawRecord::new());
        assert_eq!(empty.features, vec![0.0, 0.0]);
        assert_eq!(empty.diagnostics.len(), 2);
        assert!(matches!(empty.diagnostics[0], InferenceDiagnostic::MissingFeature { .. }));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(numeric_value(&json!(2.5)), Some(2.5));
        assert_eq!(numeric_value(&json!(" 4 ")), Some(4.0));
        assert_eq!(numeric_value(&json!(true)), Some(1.0));
        assert_eq!(numeric_value(&json!([1])), None);
        assert_eq!(numeric_value(&json!("NaN")), None);
    }

    #[test]
    fn test_predict_rescales_and_sums_to_one() {
        let engine = engine();
        let prediction = engine
            .predict(&record(json!({"Peer pressure": 4, "Study Environment": "Peaceful"})))
            .unwrap();

        assert_eq!(prediction.class, 4);
        let total: f64 = prediction.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(prediction.confidence(), 1.0);
    }

    #[test]
    fn test_batch_matches_single() {
        let engine = engine();
        let rows: Vec<RawRecord> = (1..=4)
            .map(|p| record(json!({"Peer pressure": p, "Study Environment": "Noisy"})))
            .chain(std::iter::once(RawRecord::new()))
            .collect();

        let batch = engine.predict_batch(&rows).unwrap();
        for (row, &class) in rows.iter().zip(&batch) {
            assert_eq!(engine.predict(row).unwrap().class, class);
        }
        assert!(engine.predict_batch(&[]).unwrap().is_empty());
    }
}
