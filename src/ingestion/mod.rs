//! Ingestion Module
//!
//! Raw CSV files into the store:
//! - Schema inference (polars CSV scan -> closed storage types)
//! - Idempotent table creation
//! - Bulk COPY loading
//!
//! `table_builder` and `bulk_loader` are reused for the derived summary table.

pub mod bulk_loader;
pub mod discovery;
pub mod orchestrator;
pub mod schema_inference;
pub mod table_builder;

pub use bulk_loader::{bulk_load, bulk_load_file};
pub use discovery::{discover_csv_files, table_name_for, SourceFile};
pub use orchestrator::IngestionOrchestrator;
pub use schema_inference::{columns_from_schema, infer_columns, ColumnDescriptor, SchemaInference, StorageType, ValueKind};
pub use table_builder::ensure_table;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one input file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileStatus {
    Loaded,
    ParseFailed,
    ProvisionFailed,
    LoadFailed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub table_name: String,
    pub status: FileStatus,
    pub rows_loaded: u64,
    /// Error message, also set on a successful load that followed a failed CREATE
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn new(file: &SourceFile) -> Self {
        Self {
            path: file.path.clone(),
            table_name: file.table_name.clone(),
            status: FileStatus::LoadFailed,
            rows_loaded: 0,
            error: None,
        }
    }

    pub fn loaded(&mut self, rows: u64) {
        self.status = FileStatus::Loaded;
        self.rows_loaded = rows;
    }

    pub fn fail(&mut self, status: FileStatus, error: &dyn std::error::Error) {
        self.status = status;
        self.error = Some(error.to_string());
    }

    pub fn is_loaded(&self) -> bool {
        self.status == FileStatus::Loaded
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestionStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionReport {
    pub files: Vec<FileOutcome>,
    pub status: IngestionStatus,
}

impl IngestionReport {
    pub fn new(files: Vec<FileOutcome>) -> Self {
        let loaded = files.iter().filter(|f| f.is_loaded()).count();
        let status = if loaded == files.len() {
            IngestionStatus::Success
        } else if loaded > 0 {
            IngestionStatus::Partial
        } else {
            IngestionStatus::Failed
        };
        Self { files, status }
    }

    pub fn loaded_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_loaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.len() - self.loaded_count()
    }

    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|f| f.rows_loaded).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_loaded())
    }
}
