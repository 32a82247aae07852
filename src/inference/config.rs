//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for model inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Rows encoded per parallel work unit in batch prediction
    pub batch_size: usize,

    /// Rows returned in the preview of a CSV batch prediction
    pub preview_rows: usize,

    /// Emit a warning log for every fallback diagnostic
    pub log_diagnostics: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 256,
            preview_rows: 50,
            log_diagnostics: true,
        }
    }
}

impl InferenceConfig {
    /// Builder method to set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builder method to set the CSV preview length
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Builder method to silence per-prediction warnings
    pub fn with_log_diagnostics(mut self, enabled: bool) -> Self {
        self.log_diagnostics = enabled;
        self
    }
}
