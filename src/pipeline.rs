//! Pipeline driver
//!
//! `Connecting -> IngestingFiles -> Aggregating -> Deriving -> PersistingSummary
//! -> Exporting -> Closed`, or `Failed` from any stage. The connection opened
//! at `Connecting` is closed exactly once whichever way the run ends.

use crate::config::PipelineConfig;
use crate::db;
use crate::error::{EtlError, Result};
use crate::ingestion::{IngestionOrchestrator, IngestionReport, SchemaInference};
use crate::summary::{compute_vendor_summary, derive_metrics, persist_summary, summary_frame, SnapshotWriter};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStage {
    Connecting,
    IngestingFiles,
    Aggregating,
    Deriving,
    PersistingSummary,
    Exporting,
    Closed,
    Failed,
}

/// Which half of the pipeline to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Raw files only
    Ingest,
    /// Summary, persistence and snapshot only
    Summarize,
    Full,
}

impl RunMode {
    pub fn ingests(&self) -> bool {
        matches!(self, RunMode::Ingest | RunMode::Full)
    }

    pub fn summarizes(&self) -> bool {
        matches!(self, RunMode::Summarize | RunMode::Full)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub stage: RunStage,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub ingestion: Option<IngestionReport>,
    pub summary_rows: Option<usize>,
    pub summary_rows_loaded: Option<u64>,
    /// Non-fatal error while persisting the summary table, also set when a
    /// failed CREATE was followed by a successful load
    pub summary_error: Option<String>,
    pub snapshot: Option<PathBuf>,
}

impl RunReport {
    fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            stage: RunStage::Connecting,
            started_at: Local::now(),
            finished_at: None,
            ingestion: None,
            summary_rows: None,
            summary_rows_loaded: None,
            summary_error: None,
            snapshot: None,
        }
    }

    fn enter(&mut self, stage: RunStage) {
        info!(?stage, "Entering stage");
        self.stage = stage;
    }

    fn finish(&mut self, terminal: RunStage) {
        self.finished_at = Some(Local::now());
        self.stage = terminal;
    }

    pub fn succeeded(&self) -> bool {
        self.stage == RunStage::Closed
    }

    /// Files and summary load that failed without stopping the run
    pub fn non_fatal_failures(&self) -> usize {
        let files = self.ingestion.as_ref().map(|r| r.failed_count()).unwrap_or(0);
        let summary = self.summary_error.is_some() && self.summary_rows_loaded.is_none();
        files + usize::from(summary)
    }
}

/// A fatal failure, with the stage it happened in and what the run got done before it
#[derive(Debug, thiserror::Error)]
#[error("run failed during {stage:?}: {source}")]
pub struct RunError {
    pub stage: RunStage,
    pub report: Box<RunReport>,
    #[source]
    pub source: EtlError,
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    snapshot_writer: &'a dyn SnapshotWriter,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, snapshot_writer: &'a dyn SnapshotWriter) -> Self {
        Self { config, snapshot_writer }
    }

    /// Execute one run. Fatal errors come back as [`RunError`] after the
    /// connection has been released.
    pub async fn run(&self, mode: RunMode) -> std::result::Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", %run_id);
        self.run_inner(run_id, mode).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, mode: RunMode) -> std::result::Result<RunReport, RunError> {
        let mut report = RunReport::new(run_id, mode);
        info!("--------------------------------------------------");
        info!("RUN START: {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
        info!("--------------------------------------------------");

        let outcome = match self.config.validate() {
            Ok(()) => self.connect_and_run(mode, &mut report).await,
            Err(e) => Err(e),
        };

        let failed_stage = report.stage;
        match &outcome {
            Ok(()) => {
                report.finish(RunStage::Closed);
                let failures = report.non_fatal_failures();
                if failures == 0 {
                    info!("ETL process completed successfully");
                } else {
                    warn!(failures, "ETL process completed with {} non-fatal failure(s)", failures);
                }
            }
            Err(e) => {
                error!(stage = ?failed_stage, error = %e, "ETL process failed");
                report.finish(RunStage::Failed);
            }
        }

        let finished = report.finished_at.unwrap_or_else(Local::now);
        info!("--------------------------------------------------");
        info!("RUN END: {}", finished.format("%Y-%m-%d %H:%M:%S"));
        info!("--------------------------------------------------");

        match outcome {
            Ok(()) => Ok(report),
            Err(source) => Err(RunError {
                stage: failed_stage,
                report: Box::new(report),
                source,
            }),
        }
    }

    async fn connect_and_run(&self, mode: RunMode, report: &mut RunReport) -> Result<()> {
        report.enter(RunStage::Connecting);
        let mut conn = db::connect(&self.config.store).await?;

        let outcome = self.run_stages(&mut conn, mode, report).await;
        db::close(conn).await;
        outcome
    }

    async fn run_stages(&self, conn: &mut PgConnection, mode: RunMode, report: &mut RunReport) -> Result<()> {
        if mode.ingests() {
            report.enter(RunStage::IngestingFiles);
            let orchestrator = IngestionOrchestrator::new(
                SchemaInference::new().with_sample_rows(self.config.infer_schema_rows),
            );
            let ingestion = orchestrator.ingest_directory(conn, &self.config.data_dir).await?;
            for failure in ingestion.failures() {
                warn!(
                    table = %failure.table_name,
                    status = ?failure.status,
                    error = failure.error.as_deref().unwrap_or(""),
                    "File not loaded"
                );
            }
            if ingestion.failed_count() == 0 {
                println!("All CSV files loaded successfully!");
            }
            report.ingestion = Some(ingestion);
        }

        if mode.summarizes() {
            report.enter(RunStage::Aggregating);
            let records = compute_vendor_summary(conn, self.config.fetch_batch_size).await?;

            report.enter(RunStage::Deriving);
            info!("Starting data cleaning...");
            let rows = derive_metrics(records);
            let mut frame = summary_frame(&rows)?;
            report.summary_rows = Some(rows.len());
            info!(rows = rows.len(), "Data cleaning completed");

            report.enter(RunStage::PersistingSummary);
            match persist_summary(conn, &self.config.summary_table, &rows, &frame).await {
                Ok(load) => {
                    report.summary_rows_loaded = Some(load.rows_loaded);
                    report.summary_error = load.provision_error.map(|e| e.to_string());
                }
                Err(e) if !e.is_fatal() => report.summary_error = Some(e.to_string()),
                Err(e) => return Err(e),
            }

            report.enter(RunStage::Exporting);
            let run_date = report.started_at.date_naive();
            let path = self.snapshot_writer.write_snapshot(&mut frame, run_date)?;
            report.snapshot = Some(path);
        }

        Ok(())
    }
}
