//! Model persistence
//!
//! The trained model is kept as a single latest snapshot on disk.

mod snapshot;

pub use snapshot::{ModelSnapshot, SnapshotInfo, SNAPSHOT_FORMAT_VERSION, SNAPSHOT_MAGIC};
