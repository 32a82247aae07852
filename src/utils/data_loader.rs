//! Data loading utilities
//!
//! Reads the raw survey CSV from a local file, from the first CSV inside a
//! dataset directory, or from an HTTP(S) URL, and hands back a polars
//! `DataFrame` or a [`CleanedDataset`].

use crate::error::{Result, StressError};
use crate::preprocessing::CleanedDataset;
use crate::training::TrainingConfig;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default timeout for remote dataset downloads
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Cell tokens read as missing, on top of empty cells
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Where the raw dataset comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSource {
    /// A single CSV file
    File(PathBuf),
    /// A directory holding the downloaded dataset; the first CSV is used
    Directory(PathBuf),
    /// An HTTP(S) URL pointing at a CSV file
    Url(String),
}

impl DatasetSource {
    /// Interpret a user-supplied location
    pub fn parse(location: &str) -> Self {
        let lower = location.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DatasetSource::Url(location.to_string())
        } else if Path::new(location).is_dir() {
            DatasetSource::Directory(PathBuf::from(location))
        } else {
            DatasetSource::File(PathBuf::from(location))
        }
    }
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Directory(PathBuf::from("data"))
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "file {}", path.display()),
            DatasetSource::Directory(path) => write!(f, "directory {}", path.display()),
            DatasetSource::Url(url) => write!(f, "url {}", url),
        }
    }
}

/// Data loader for the survey dataset
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Timeout for remote downloads
    fetch_timeout: Duration,
    /// Rows used by polars to infer column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            infer_schema_length: 1000,
        }
    }

    /// Set the download timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Load the raw dataset without cleaning
    pub fn load(&self, source: &DatasetSource) -> Result<DataFrame> {
        match source {
            DatasetSource::File(path) => self.load_csv(path),
            DatasetSource::Directory(dir) => {
                let path = Self::find_csv(dir)?;
                self.load_csv(&path)
            }
            DatasetSource::Url(url) => {
                let bytes = self.fetch(url)?;
                self.load_csv_bytes(&bytes)
            }
        }
    }

    /// Load and clean the dataset: trimmed column names, dropped
    /// non-predictive columns, no rows with missing values
    pub fn load_and_clean(
        &self,
        source: &DatasetSource,
        config: &TrainingConfig,
    ) -> Result<CleanedDataset> {
        let start = Instant::now();
        let df = self.load(source)?;
        let raw_rows = df.height();

        let dataset = CleanedDataset::from_dataframe(&df, &config.drop_columns)?;
        dataset.require_column(&config.target_column)?;

        info!(
            source = %source,
            raw_rows,
            rows = dataset.n_rows(),
            dropped_rows = dataset.dropped_rows(),
            columns = dataset.n_columns(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded and cleaned"
        );

        Ok(dataset)
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            StressError::DataUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        self.csv_options()
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| StressError::DataUnavailable(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Parse CSV content held in memory
    pub fn load_csv_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        self.csv_options()
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| StressError::DataUnavailable(format!("cannot parse CSV: {}", e)))
    }

    /// Reader options shared by file, download and upload paths
    fn csv_options(&self) -> CsvReadOptions {
        let null_values = NA_TOKENS.iter().map(|token| (*token).into()).collect();
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_null_values(Some(NullValues::AllColumns(null_values))),
            )
    }

    /// First CSV file of a dataset directory, by file name
    fn find_csv(dir: &Path) -> Result<PathBuf> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            StressError::DataUnavailable(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut csv_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        csv_files.sort();

        csv_files.into_iter().next().ok_or_else(|| {
            StressError::DataUnavailable(format!("no CSV file found in {}", dir.display()))
        })
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, timeout_secs = self.fetch_timeout.as_secs(), "Downloading dataset");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.fetch_timeout)
            .build()
            .map_err(|e| StressError::DataUnavailable(format!("cannot build HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| StressError::DataUnavailable(format!("download failed: {}", e)))?;

        let bytes = response
            .bytes()
            .map_err(|e| StressError::DataUnavailable(format!("download interrupted: {}", e)))?;

        info!(url = %url, bytes = bytes.len(), "Dataset downloaded");
        Ok(bytes.to_vec())
    }
}
