//! Error types for the academic stress classifier

use thiserror::Error;

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, StressError>;

/// Main error type for the classifier lifecycle
#[derive(Error, Debug)]
pub enum StressError {
    /// The dataset source could not be fetched or read, or holds no usable CSV
    #[error("Dataset unavailable: {0}")]
    DataUnavailable(String),

    /// An expected column is missing or has the wrong shape
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The stratified split cannot be performed
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Inference or metrics requested before a model was trained or loaded
    #[error("Model not trained")]
    ModelNotReady,

    /// No snapshot exists at the given location
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    /// The snapshot exists but cannot be decoded
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StressError {
    /// Whether the caller can recover (retrain, fix its request) without restarting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StressError::ModelNotReady
                | StressError::NotFound(_)
                | StressError::CorruptSnapshot(_)
                | StressError::InvalidInput(_)
        )
    }
}

impl From<polars::error::PolarsError> for StressError {
    fn from(err: polars::error::PolarsError) -> Self {
        StressError::DataUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StressError {
    fn from(err: serde_json::Error) -> Self {
        StressError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for StressError {
    fn from(err: bincode::Error) -> Self {
        StressError::CorruptSnapshot(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StressError::SchemaError("missing target".to_string());
        assert_eq!(err.to_string(), "Schema error: missing target");
        assert_eq!(StressError::ModelNotReady.to_string(), "Model not trained");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StressError = io_err.into();
        assert!(matches!(err, StressError::Io(_)));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(StressError::ModelNotReady.is_recoverable());
        assert!(StressError::CorruptSnapshot("bad magic".into()).is_recoverable());
        assert!(!StressError::DataUnavailable("offline".into()).is_recoverable());
        assert!(!StressError::InsufficientData("one row".into()).is_recoverable());
    }
}
