//! Run configuration

use crate::db::StoreConfig;
use crate::error::{EtlError, Result};
use crate::summary::{DEFAULT_FETCH_BATCH_SIZE, SUMMARY_TABLE};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory scanned for `.csv` files
    pub data_dir: PathBuf,
    pub store: StoreConfig,
    /// Rows per cursor fetch when reading the vendor summary
    pub fetch_batch_size: usize,
    /// Cap on the rows scanned per file to settle column types; `None` scans every row
    pub infer_schema_rows: Option<usize>,
    pub summary_table: String,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, store: StoreConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            store,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
            infer_schema_rows: None,
            summary_table: SUMMARY_TABLE.to_string(),
        }
    }

    pub fn with_fetch_batch_size(mut self, rows: usize) -> Self {
        self.fetch_batch_size = rows;
        self
    }

    pub fn with_infer_schema_rows(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_rows = rows;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_batch_size == 0 {
            return Err(EtlError::Config("fetch batch size must be at least 1".to_string()));
        }
        if self.infer_schema_rows == Some(0) {
            return Err(EtlError::Config("schema inference needs at least 1 sampled row".to_string()));
        }
        if self.summary_table.trim().is_empty() {
            return Err(EtlError::Config("summary table name is empty".to_string()));
        }
        Ok(())
    }
}
