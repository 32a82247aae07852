//! Training engine implementation

use super::decision_tree::DecisionTree;
use super::split::stratified_train_test_split;
use super::{to_external, to_internal, MetricsReport, TrainingConfig};
use crate::error::{Result, StressError};
use crate::preprocessing::{CleanedDataset, ColumnValues, EncodingTable};
use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Everything inference needs: the tree plus the schema it was fit on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub tree: DecisionTree,
    pub encoders: EncodingTable,
    /// Feature columns in training order
    pub feature_names: Vec<String>,
    /// Sorted distinct internal class values; tree class index `k` is `target_classes[k]`
    pub target_classes: Vec<i64>,
    pub target_column: String,
    pub trained_at: DateTime<Utc>,
}

impl ClassifierModel {
    /// External ratings of the target classes
    pub fn external_classes(&self) -> Vec<i64> {
        self.target_classes.iter().map(|&c| to_external(c)).collect()
    }
}

/// Held-out rows and the model's predictions for them (internal values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutEvaluation {
    /// Row indices into the cleaned dataset
    pub test_indices: Vec<usize>,
    pub y_true: Vec<i64>,
    pub y_pred: Vec<i64>,
    pub n_train: usize,
}

/// Result of one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: ClassifierModel,
    pub evaluation: HoldoutEvaluation,
    pub metrics: MetricsReport,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Encode, split, fit and evaluate
    pub fn fit(&self, dataset: &CleanedDataset) -> Result<TrainingOutcome> {
        let start = Instant::now();

        let encoders = EncodingTable::fit(dataset);
        let (x, targets, feature_names) = self.prepare_data(dataset, &encoders)?;

        let mut target_classes = targets.clone();
        target_classes.sort_unstable();
        target_classes.dedup();

        let labels: Vec<usize> = targets
            .iter()
            .map(|t| target_classes.binary_search(t).unwrap_or_default())
            .collect();

        let split = stratified_train_test_split(
            &labels,
            target_classes.len(),
            self.config.test_size,
            self.config.random_state,
        )?;

        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train: Vec<usize> = split.train_indices.iter().map(|&i| labels[i]).collect();

        let mut tree = DecisionTree::new()
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_random_state(self.config.random_state);
        tree.fit(&x_train, &y_train, target_classes.len())?;

        let x_test = x.select(Axis(0), &split.test_indices);
        let y_pred: Vec<i64> = tree
            .predict(&x_test)?
            .iter()
            .map(|&k| target_classes[k])
            .collect();
        let y_true: Vec<i64> = split.test_indices.iter().map(|&i| targets[i]).collect();

        let importances = tree
            .feature_importances()
            .map(|imp| imp.to_vec())
            .unwrap_or_default();
        let metrics = MetricsReport::compute(
            &y_true,
            &y_pred,
            &target_classes,
            &importances,
            &feature_names,
        );

        info!(
            rows = dataset.n_rows(),
            n_train = split.train_indices.len(),
            n_test = split.test_indices.len(),
            n_features = feature_names.len(),
            n_classes = target_classes.len(),
            depth = tree.depth(),
            leaves = tree.n_leaves(),
            accuracy = metrics.accuracy,
            baseline = metrics.baseline_accuracy,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model trained"
        );

        let evaluation = HoldoutEvaluation {
            test_indices: split.test_indices,
            y_true,
            y_pred,
            n_train: split.train_indices.len(),
        };

        let model = ClassifierModel {
            tree,
            encoders,
            feature_names,
            target_classes,
            target_column: self.config.target_column.clone(),
            trained_at: Utc::now(),
        };

        Ok(TrainingOutcome {
            model,
            evaluation,
            metrics,
        })
    }

    /// Feature matrix, internal targets and feature names
    fn prepare_data(
        &self,
        dataset: &CleanedDataset,
        encoders: &EncodingTable,
    ) -> Result<(Array2<f64>, Vec<i64>, Vec<String>)> {
        let target_name = &self.config.target_column;
        let target = dataset.require_column(target_name)?;

        let ratings = match &target.values {
            ColumnValues::Numeric(values) => values,
            ColumnValues::Categorical(_) => {
                return Err(StressError::SchemaError(format!(
                    "target column '{}' must be numeric",
                    target_name
                )))
            }
        };

        let targets = ratings
            .iter()
            .map(|&r| {
                to_internal(r).ok_or_else(|| {
                    StressError::SchemaError(format!(
                        "target column '{}' holds {}, expected an integer rating of at least 1",
                        target_name, r
                    ))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        let mut feature_names = Vec::new();
        let mut feature_columns = Vec::new();
        for column in dataset.columns() {
            if &column.name == target_name {
                continue;
            }
            let values = match &column.values {
                ColumnValues::Numeric(values) => values.clone(),
                ColumnValues::Categorical(values) => encoders.encode_values(&column.name, values)?,
            };
            feature_names.push(column.name.clone());
            feature_columns.push(values);
        }

        if feature_names.is_empty() {
            return Err(StressError::SchemaError(
                "dataset has no feature columns besides the target".to_string(),
            ));
        }

        let x = Array2::from_shape_fn((dataset.n_rows(), feature_columns.len()), |(i, j)| {
            feature_columns[j][i]
        });

        Ok((x, targets, feature_names))
    }
}
