//! Durable model snapshot
//!
//! A snapshot is a single bincode blob: a small envelope (magic bytes,
//! format version, FNV-1a checksum) around the serialized model. Saving goes
//! through a temporary file in the destination directory followed by an
//! atomic rename, so readers never observe a partially written snapshot.

use crate::error::{Result, StressError};
use crate::training::ClassifierModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Magic bytes at the start of every snapshot file
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"ASCM";

/// Current snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    magic: [u8; 4],
    format_version: u32,
    payload: Vec<u8>,
    checksum: u64,
}

fn checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Trained model plus the flag recorded at save time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model: ClassifierModel,
    pub is_trained: bool,
}

impl ModelSnapshot {
    pub fn new(model: ClassifierModel) -> Self {
        Self {
            model,
            is_trained: true,
        }
    }

    /// Check that the snapshot can serve predictions
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        let corrupt = |msg: String| Err(StressError::CorruptSnapshot(msg));

        if !self.is_trained || !model.tree.is_fitted() {
            return corrupt("snapshot holds an untrained model".to_string());
        }
        if model.target_classes.is_empty() {
            return corrupt("snapshot has no target classes".to_string());
        }
        if model.target_classes.windows(2).any(|w| w[0] >= w[1]) {
            return corrupt("target classes are not sorted and distinct".to_string());
        }
        if model.tree.n_features() != model.feature_names.len() {
            return corrupt(format!(
                "tree expects {} features but the schema lists {}",
                model.tree.n_features(),
                model.feature_names.len()
            ));
        }
        if model.tree.n_classes() != model.target_classes.len() {
            return corrupt(format!(
                "tree predicts {} classes but the snapshot lists {}",
                model.tree.n_classes(),
                model.target_classes.len()
            ));
        }
        Ok(())
    }

    /// Encode into the on-disk format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| StressError::Serialization(format!("Failed to serialize model: {}", e)))?;
        let envelope = SnapshotEnvelope {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: checksum(&payload),
            payload,
        };
        bincode::serialize(&envelope)
            .map_err(|e| StressError::Serialization(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Decode and validate the on-disk format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(&SNAPSHOT_MAGIC) {
            return Err(StressError::CorruptSnapshot(
                "not a model snapshot (bad magic)".to_string(),
            ));
        }

        let envelope: SnapshotEnvelope = bincode::deserialize(bytes)?;
        if envelope.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StressError::CorruptSnapshot(format!(
                "unsupported snapshot format version {}",
                envelope.format_version
            )));
        }
        if checksum(&envelope.payload) != envelope.checksum {
            return Err(StressError::CorruptSnapshot(
                "checksum verification failed".to_string(),
            ));
        }

        let snapshot: ModelSnapshot = bincode::deserialize(&envelope.payload)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Atomically write the snapshot to `path`, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StressError::Io(e.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "Model snapshot saved");
        Ok(())
    }

    /// Read a snapshot; `NotFound` when nothing exists at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StressError::NotFound(path.display().to_string()),
            _ => StressError::Io(e),
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Reading model snapshot");
        Self::from_bytes(&bytes)
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo::from(&self.model)
    }
}

/// Summary of a trained model for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub trained_at: DateTime<Utc>,
    pub target_column: String,
    /// External ratings
    pub classes: Vec<i64>,
    pub feature_names: Vec<String>,
    pub tree_depth: usize,
    pub n_leaves: usize,
    pub format_version: u32,
}

impl From<&ClassifierModel> for SnapshotInfo {
    fn from(model: &ClassifierModel) -> Self {
        Self {
            trained_at: model.trained_at,
            target_column: model.target_column.clone(),
            classes: model.external_classes(),
            feature_names: model.feature_names.clone(),
            tree_depth: model.tree.depth(),
            n_leaves: model.tree.n_leaves(),
            format_version: SNAPSHOT_FORMAT_VERSION,
        }
    }
}
