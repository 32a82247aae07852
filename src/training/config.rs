//! Training configuration

use serde::{Deserialize, Serialize};

/// Target column of the student academic stress survey
pub const DEFAULT_TARGET_COLUMN: &str = "Rate your academic stress index";

/// Column carrying the survey submission time, never predictive
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "Timestamp";

/// Configuration for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Columns removed before training when present
    pub drop_columns: Vec<String>,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Random seed for the split and for split tie-breaking in the tree
    pub random_state: u64,

    /// Maximum depth of the tree
    pub max_depth: usize,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            drop_columns: vec![DEFAULT_TIMESTAMP_COLUMN.to_string()],
            test_size: 0.2,
            random_state: 42,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration for the given target column
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to replace the list of dropped columns
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }
}
