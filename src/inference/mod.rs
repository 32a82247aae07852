//! Inference module
//!
//! Turns raw records into feature vectors in training-schema order, runs
//! the tree, and exposes the process-wide [`ClassifierService`].
//!
//! Inputs never fail because of a single bad value: missing features,
//! unparseable numbers and unseen categories fall back to 0 and are
//! reported as [`InferenceDiagnostic`]s next to the prediction. Code 0 of a
//! categorical feature is the first category in sort order, not a neutral
//! value.

mod config;
mod engine;
mod service;

pub use config::InferenceConfig;
pub use engine::{InferenceEngine, PreparedRecord};
pub use service::{ClassifierService, ModelState};

use crate::preprocessing::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column appended to CSV batch results
pub const PREDICTION_COLUMN: &str = "Predicted_Stress_Level";

/// Fallback applied while encoding a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferenceDiagnostic {
    /// Categorical value not seen during training, encoded as 0
    UnseenCategory { feature: String, value: String },
    /// Feature absent or null, encoded as 0
    MissingFeature { feature: String },
    /// Numeric feature that could not be parsed, encoded as 0
    InvalidNumber { feature: String, value: String },
}

impl InferenceDiagnostic {
    pub fn feature(&self) -> &str {
        match self {
            InferenceDiagnostic::UnseenCategory { feature, .. }
            | InferenceDiagnostic::MissingFeature { feature }
            | InferenceDiagnostic::InvalidNumber { feature, .. } => feature,
        }
    }
}

impl fmt::Display for InferenceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceDiagnostic::UnseenCategory { feature, value } => {
                write!(f, "unseen value '{}' for '{}', using code 0", value, feature)
            }
            InferenceDiagnostic::MissingFeature { feature } => {
                write!(f, "feature '{}' missing, using 0", feature)
            }
            InferenceDiagnostic::InvalidNumber { feature, value } => {
                write!(f, "value '{}' for '{}' is not a number, using 0", value, feature)
            }
        }
    }
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted stress rating (1-5)
    pub class: i64,
    /// One probability per target class, in class order
    pub probabilities: Vec<f64>,
    pub diagnostics: Vec<InferenceDiagnostic>,
}

impl Prediction {
    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        self.probabilities.iter().copied().fold(0.0, f64::max)
    }
}

/// Outcome of a CSV batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub total_predictions: usize,
    /// Predicted ratings for every row
    pub predictions: Vec<i64>,
    /// Leading input rows with [`PREDICTION_COLUMN`] added
    pub preview: Vec<RawRecord>,
}
