//! Vendor ETL
//!
//! Loads a directory of CSV extracts into PostgreSQL, builds a per-vendor
//! sales/purchase/freight summary from them, enriches it with profitability
//! metrics, writes it back as a table and exports a dated snapshot.

pub mod config;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod pipeline;
pub mod summary;

pub use config::PipelineConfig;
pub use db::StoreConfig;
pub use error::{EtlError, Result};
pub use ingestion::{IngestionOrchestrator, IngestionReport, SchemaInference};
pub use pipeline::{Pipeline, RunError, RunMode, RunReport, RunStage};
pub use summary::{FileSnapshotWriter, SnapshotFormat, SnapshotWriter, VendorSummary};
