//! Model training module
//!
//! Provides the training side of the classifier:
//! - Stratified train/test split with a seeded shuffle
//! - Gini decision tree with bounded depth
//! - Held-out metrics and feature importances

mod config;
mod engine;
pub mod decision_tree;
pub mod metrics;
pub mod split;

pub use config::{TrainingConfig, DEFAULT_TARGET_COLUMN, DEFAULT_TIMESTAMP_COLUMN};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{ClassifierModel, HoldoutEvaluation, TrainEngine, TrainingOutcome};
pub use metrics::{AverageReport, ClassReport, FeatureImportance, MetricsReport};
pub use split::{stratified_train_test_split, StratifiedSplit};

/// Offset between the external stress rating and the internal class value
pub const LABEL_OFFSET: i64 = 1;

/// Internal class value of an external rating; `None` unless the rating is
/// an integer of at least 1
pub fn to_internal(rating: f64) -> Option<i64> {
    if rating.is_finite() && rating.fract() == 0.0 && rating >= LABEL_OFFSET as f64 {
        Some(rating as i64 - LABEL_OFFSET)
    } else {
        None
    }
}

/// External rating of an internal class value
pub fn to_external(class: i64) -> i64 {
    class + LABEL_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_offset() {
        assert_eq!(to_internal(1.0), Some(0));
        assert_eq!(to_internal(5.0), Some(4));
        assert_eq!(to_internal(0.0), None);
        assert_eq!(to_internal(2.5), None);
        assert_eq!(to_internal(f64::NAN), None);
        assert_eq!(to_external(2), 3);
    }
}
