//! Data preprocessing module
//!
//! Cleaning of the raw survey table and label encoding of its categorical
//! columns.

mod dataset;
mod encoder;

pub use dataset::{records_from_dataframe, CleanedDataset, ColumnValues, DatasetColumn};
pub use encoder::{EncodingTable, LabelEncoder};

use serde::{Deserialize, Serialize};

/// One input row: feature name to raw value (number, string, boolean or null)
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Column data type after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}
