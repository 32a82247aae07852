//! Academic Stress - decision-tree classifier for student stress levels
//!
//! This crate provides the full classifier lifecycle:
//! - Dataset acquisition from a file, directory or URL
//! - Cleaning, label encoding and a stratified holdout split
//! - A shallow CART decision tree with evaluation metrics
//! - Versioned model snapshots
//! - Single, batch and CSV inference
//! - HTTP server and CLI interfaces
//!
//! # Modules
//!
//! - [`preprocessing`] - Cleaned datasets and categorical encoders
//! - [`training`] - Split, tree fitting and metrics
//! - [`inference`] - Record preparation and the shared [`ClassifierService`]
//! - [`export`] - Model snapshot persistence
//! - [`utils`] - Dataset loading
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! [`ClassifierService`]: inference::ClassifierService

// Core error handling
pub mod error;
pub mod config;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;
pub mod export;

// Utilities
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{Result, StressError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, StressError};

    // Configuration
    pub use crate::config::{AppConfig, ClassifierConfig};

    // Preprocessing
    pub use crate::preprocessing::{CleanedDataset, EncodingTable, LabelEncoder, RawRecord};

    // Training
    pub use crate::training::{DecisionTree, MetricsReport, TrainEngine, TrainingConfig};

    // Inference
    pub use crate::inference::{ClassifierService, InferenceConfig, InferenceEngine, Prediction};

    // Export
    pub use crate::export::{ModelSnapshot, SnapshotInfo};

    // Data loading
    pub use crate::utils::{DataLoader, DatasetSource};
}
