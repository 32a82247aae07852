//! Application configuration
//!
//! Defaults come from environment variables; CLI flags override them.

use crate::inference::InferenceConfig;
use crate::server::ServerConfig;
use crate::training::TrainingConfig;
use crate::utils::data_loader::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::utils::DatasetSource;
use std::path::PathBuf;

/// Default location of the model snapshot
pub const DEFAULT_MODEL_PATH: &str = "models/model.bin";

/// Configuration of the classifier lifecycle
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Raw dataset location (`STRESS_DATASET`)
    pub dataset: DatasetSource,
    /// Snapshot path (`STRESS_MODEL_PATH`)
    pub model_path: PathBuf,
    /// Timeout for URL datasets (`STRESS_FETCH_TIMEOUT_SECS`)
    pub fetch_timeout_secs: u64,
    pub training: TrainingConfig,
    pub inference: InferenceConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dataset: std::env::var("STRESS_DATASET")
                .map(|s| DatasetSource::parse(&s))
                .unwrap_or_default(),
            model_path: std::env::var("STRESS_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            fetch_timeout_secs: std::env::var("STRESS_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            training: TrainingConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_dataset(mut self, dataset: DatasetSource) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }
}

/// Whole-application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = ClassifierConfig::default()
            .with_dataset(DatasetSource::Url("https://example.org/data.csv".to_string()))
            .with_model_path("/tmp/stress/model.bin")
            .with_fetch_timeout_secs(5)
            .with_training(TrainingConfig::default().with_max_depth(4));

        assert_eq!(
            config.dataset,
            DatasetSource::Url("https://example.org/data.csv".to_string())
        );
        assert_eq!(config.model_path, PathBuf::from("/tmp/stress/model.bin"));
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.training.max_depth, 4);
        assert_eq!(config.inference.preview_rows, 50);
    }
}
