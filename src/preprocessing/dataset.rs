//! Cleaned tabular dataset
//!
//! Converts a polars `DataFrame` into typed columns with trimmed names,
//! without dropped columns and without rows holding a missing value.

use super::{ColumnType, RawRecord};
use crate::error::{Result, StressError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Values of a single cleaned column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValues::Numeric(_) => ColumnType::Numeric,
            ColumnValues::Categorical(_) => ColumnType::Categorical,
        }
    }

    fn select(&self, rows: &[usize]) -> Self {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnValues::Categorical(v) => {
                ColumnValues::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    fn value(&self, row: usize) -> Value {
        match self {
            ColumnValues::Numeric(v) => Value::from(v[row]),
            ColumnValues::Categorical(v) => Value::String(v[row].clone()),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl DatasetColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.values.column_type()
    }
}

/// Dataset after cleaning; every cell is present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    columns: Vec<DatasetColumn>,
    n_rows: usize,
    dropped_rows: usize,
}

/// Cell read from a polars column; `None` marks a missing value
enum RawColumn {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl RawColumn {
    fn is_present(&self, row: usize) -> bool {
        match self {
            RawColumn::Numeric(v) => v[row].is_some(),
            RawColumn::Categorical(v) => v[row].is_some(),
        }
    }

    fn into_values(self, keep: &[usize]) -> ColumnValues {
        match self {
            RawColumn::Numeric(v) => {
                ColumnValues::Numeric(keep.iter().filter_map(|&i| v[i]).collect())
            }
            RawColumn::Categorical(mut v) => ColumnValues::Categorical(
                keep.iter().filter_map(|&i| v[i].take()).collect(),
            ),
        }
    }
}

impl CleanedDataset {
    /// Clean a raw frame: trim column names, remove `drop_columns` when
    /// present, and drop every row holding a missing value.
    ///
    /// String columns become categorical, booleans become the categories
    /// `"true"`/`"false"`, everything else is read as `f64`.
    pub fn from_dataframe(df: &DataFrame, drop_columns: &[String]) -> Result<Self> {
        let dropped: HashSet<&str> = drop_columns.iter().map(|c| c.trim()).collect();
        let mut seen = HashSet::new();
        let mut raw = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str().trim().to_string();
            if dropped.contains(name.as_str()) {
                continue;
            }
            if !seen.insert(name.clone()) {
                return Err(StressError::SchemaError(format!(
                    "duplicate column '{}' after trimming names",
                    name
                )));
            }
            raw.push((name, read_column(column)?));
        }

        let n_raw = df.height();
        let keep: Vec<usize> = (0..n_raw)
            .filter(|&row| raw.iter().all(|(_, col)| col.is_present(row)))
            .collect();

        let columns = raw
            .into_iter()
            .map(|(name, col)| DatasetColumn {
                name,
                values: col.into_values(&keep),
            })
            .collect();

        Ok(Self {
            columns,
            n_rows: keep.len(),
            dropped_rows: n_raw - keep.len(),
        })
    }

    /// Build a dataset from already typed columns. Rows with a NaN or an
    /// empty category are dropped.
    pub fn from_columns(columns: Vec<DatasetColumn>) -> Result<Self> {
        let n_raw = columns.first().map_or(0, |c| c.values.len());
        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != n_raw {
                return Err(StressError::SchemaError(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    n_raw
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(StressError::SchemaError(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        let keep: Vec<usize> = (0..n_raw)
            .filter(|&row| {
                columns.iter().all(|c| match &c.values {
                    ColumnValues::Numeric(v) => !v[row].is_nan(),
                    ColumnValues::Categorical(v) => !v[row].trim().is_empty(),
                })
            })
            .collect();

        let columns = columns
            .into_iter()
            .map(|c| DatasetColumn {
                name: c.name.trim().to_string(),
                values: c.values.select(&keep),
            })
            .collect();

        Ok(Self {
            columns,
            n_rows: keep.len(),
            dropped_rows: n_raw - keep.len(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Rows removed because of missing values
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn columns(&self) -> &[DatasetColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&DatasetColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column lookup that fails with a schema error
    pub fn require_column(&self, name: &str) -> Result<&DatasetColumn> {
        self.column(name).ok_or_else(|| {
            StressError::SchemaError(format!("column '{}' not found in dataset", name))
        })
    }

    /// Reconstruct row `index` as a raw record keyed by column name
    pub fn row(&self, index: usize) -> Option<RawRecord> {
        if index >= self.n_rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values.value(index)))
                .collect(),
        )
    }
}

fn read_column(column: &Column) -> Result<RawColumn> {
    let schema_err = |e: PolarsError| {
        StressError::SchemaError(format!("cannot read column '{}': {}", column.name(), e))
    };

    match column.dtype() {
        DataType::String => {
            let ca = column.str().map_err(schema_err)?;
            Ok(RawColumn::Categorical(
                ca.into_iter()
                    .map(|v| v.filter(|s| !s.trim().is_empty()).map(str::to_string))
                    .collect(),
            ))
        }
        DataType::Boolean => {
            let ca = column.bool().map_err(schema_err)?;
            Ok(RawColumn::Categorical(
                ca.into_iter().map(|v| v.map(|b| b.to_string())).collect(),
            ))
        }
        _ => {
            let casted = column.cast(&DataType::Float64).map_err(schema_err)?;
            let ca = casted.f64().map_err(schema_err)?;
            Ok(RawColumn::Numeric(
                ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect(),
            ))
        }
    }
}

/// Convert every row of a frame into a raw record, keeping the source
/// cell types (integers stay integers, strings stay strings, nulls stay null).
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut records: Vec<RawRecord> = vec![RawRecord::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().as_str().trim().to_string();
        let invalid = |e: PolarsError| {
            StressError::InvalidInput(format!("cannot read column '{}': {}", name, e))
        };

        let cells: Vec<Value> = match column.dtype() {
            DataType::String => column
                .str()
                .map_err(invalid)?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
                .collect(),
            DataType::Boolean => column
                .bool()
                .map_err(invalid)?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Bool))
                .collect(),
            dtype if dtype.is_integer() => {
                let casted = column.cast(&DataType::Int64).map_err(invalid)?;
                casted
                    .i64()
                    .map_err(invalid)?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::from))
                    .collect()
            }
            _ => {
                let casted = column.cast(&DataType::Float64).map_err(invalid)?;
                casted
                    .f64()
                    .map_err(invalid)?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::from))
                    .collect()
            }
        };

        for (record, cell) in records.iter_mut().zip(cells) {
            record.insert(name.clone(), cell);
        }
    }

    Ok(records)
}
