//! Label encoding of categorical columns

use super::{CleanedDataset, ColumnValues};
use crate::error::{Result, StressError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Ordinal encoder for one column. Codes are assigned in sorted order of
/// the distinct training values, starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the observed values of a column
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let classes: BTreeSet<&str> = values.iter().map(|v| v.as_ref()).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    /// Code of a category seen during fit
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Category carried by a code
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Known categories, in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Encoders of every categorical column, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingTable {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncodingTable {
    /// Fit one encoder per categorical column of the dataset
    pub fn fit(dataset: &CleanedDataset) -> Self {
        let encoders = dataset
            .columns()
            .iter()
            .filter_map(|column| match &column.values {
                ColumnValues::Categorical(values) => {
                    Some((column.name.clone(), LabelEncoder::fit(values)))
                }
                ColumnValues::Numeric(_) => None,
            })
            .collect();

        Self { encoders }
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.encoders.contains_key(column)
    }

    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    /// Names of the encoded columns, sorted
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Known categories of a column; empty for numeric or unknown columns
    pub fn categories(&self, column: &str) -> Vec<String> {
        self.encoders
            .get(column)
            .map(|e| e.classes().to_vec())
            .unwrap_or_default()
    }

    /// Code of `value` in `column`. `None` when the column is not
    /// categorical or the value was never seen during fit.
    pub fn encode(&self, column: &str, value: &str) -> Option<usize> {
        self.encoders.get(column).and_then(|e| e.encode(value))
    }

    /// Category carried by `code` in `column`
    pub fn decode(&self, column: &str, code: usize) -> Option<&str> {
        self.encoders.get(column).and_then(|e| e.decode(code))
    }

    /// Encode a whole categorical training column into feature values
    pub fn encode_values(&self, column: &str, values: &[String]) -> Result<Vec<f64>> {
        let encoder = self.encoders.get(column).ok_or_else(|| {
            StressError::SchemaError(format!("column '{}' has no encoder", column))
        })?;

        values
            .iter()
            .map(|v| {
                encoder.encode(v).map(|code| code as f64).ok_or_else(|| {
                    StressError::InvalidInput(format!(
                        "value '{}' of column '{}' was not seen during fit",
                        v, column
                    ))
                })
            })
            .collect()
    }
}
