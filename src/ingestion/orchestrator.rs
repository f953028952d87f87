//! Ingestion Orchestrator - infer, provision and load every input file
//!
//! Failures are contained per file: a file that cannot be parsed, provisioned
//! or loaded is recorded in the report and the loop moves on. Only an
//! unreadable input directory stops ingestion.

use crate::error::{EtlError, Result};
use crate::ingestion::bulk_loader::bulk_load_file;
use crate::ingestion::discovery::{discover_csv_files, SourceFile};
use crate::ingestion::schema_inference::SchemaInference;
use crate::ingestion::table_builder::ensure_table;
use crate::ingestion::{FileOutcome, FileStatus, IngestionReport};
use sqlx::PgConnection;
use std::path::Path;
use tracing::{error, info, info_span, warn, Instrument};

pub struct IngestionOrchestrator {
    schema_inference: SchemaInference,
}

impl IngestionOrchestrator {
    pub fn new(schema_inference: SchemaInference) -> Self {
        Self { schema_inference }
    }

    /// Ingest every CSV file in `data_dir`, in file-name order
    pub async fn ingest_directory(&self, conn: &mut PgConnection, data_dir: &Path) -> Result<IngestionReport> {
        let files = discover_csv_files(data_dir)?;
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "No CSV files found");
        } else {
            info!(dir = %data_dir.display(), files = files.len(), "Discovered CSV files");
        }

        let mut outcomes = Vec::with_capacity(files.len());
        for file in &files {
            let span = info_span!("ingest_file", table = %file.table_name);
            let outcome = self.ingest_file(conn, file).instrument(span).await;
            outcomes.push(outcome);
        }

        let report = IngestionReport::new(outcomes);
        info!(
            loaded = report.loaded_count(),
            failed = report.failed_count(),
            rows = report.total_rows(),
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Parse, provision and load one file. Never returns an error: the
    /// outcome says what happened.
    pub async fn ingest_file(&self, conn: &mut PgConnection, file: &SourceFile) -> FileOutcome {
        let mut outcome = FileOutcome::new(file);

        let columns = match self.schema_inference.infer_file_columns(&file.path) {
            Ok(columns) => columns,
            Err(e) => {
                error!(path = %file.path.display(), error = %e, "Skipping file that could not be parsed");
                outcome.fail(FileStatus::ParseFailed, &e);
                return outcome;
            }
        };
        info!(columns = columns.len(), "Inferred column types for {}", file.path.display());

        // A failed CREATE is not the end: the table may already exist from an earlier run
        let provision_error = ensure_table(conn, &file.table_name, &columns).await.err();

        match bulk_load_file(conn, &file.table_name, &file.path).await {
            Ok(rows) => {
                println!("{} loaded successfully!", file.table_name);
                outcome.loaded(rows);
                if let Some(e) = provision_error {
                    outcome.error = Some(e.to_string());
                }
            }
            Err(load_error) => match provision_error {
                Some(e @ EtlError::Provision { .. }) => {
                    outcome.fail(FileStatus::ProvisionFailed, &e);
                    outcome.error = Some(format!("{}; {}", e, load_error));
                }
                _ => outcome.fail(FileStatus::LoadFailed, &load_error),
            },
        }

        outcome
    }
}

impl Default for IngestionOrchestrator {
    fn default() -> Self {
        Self::new(SchemaInference::default())
    }
}
