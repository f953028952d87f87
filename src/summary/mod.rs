//! Vendor summary: aggregate, enrich, persist, export

pub mod aggregation;
pub mod export;
pub mod frame;
pub mod metrics;

pub use aggregation::{compute_vendor_summary, VendorSummaryRecord, DEFAULT_FETCH_BATCH_SIZE};
pub use export::{FileSnapshotWriter, SnapshotFormat, SnapshotWriter};
pub use frame::{summary_csv, summary_frame, SUMMARY_COLUMNS};
pub use metrics::{derive_metrics, VendorSummary};

use crate::error::{EtlError, Result};
use crate::ingestion::{bulk_load, ensure_table, infer_columns};
use polars::prelude::DataFrame;
use sqlx::PgConnection;

pub const SUMMARY_TABLE: &str = "vendor_sales_summary";

/// What happened when the summary was written to the store
#[derive(Debug)]
pub struct SummaryLoad {
    pub rows_loaded: u64,
    /// CREATE failed but the load into an existing table went through
    pub provision_error: Option<EtlError>,
}

/// Provision the summary table from the frame's schema and COPY the rows in.
///
/// A failed CREATE is logged and the load is still attempted, the same way raw
/// files are handled. If the load also fails, both messages are returned.
pub async fn persist_summary(
    conn: &mut PgConnection,
    table_name: &str,
    rows: &[VendorSummary],
    frame: &DataFrame,
) -> Result<SummaryLoad> {
    let columns = infer_columns(frame);
    let provision_error = ensure_table(conn, table_name, &columns).await.err();

    let loaded = match summary_csv(rows, table_name) {
        Ok(buffer) => bulk_load(conn, table_name, buffer.as_slice()).await,
        Err(e) => Err(e),
    };
    combine_outcomes(table_name, provision_error, loaded)
}

fn combine_outcomes(table_name: &str, provision_error: Option<EtlError>, loaded: Result<u64>) -> Result<SummaryLoad> {
    match (loaded, provision_error) {
        (Ok(rows_loaded), provision_error) => Ok(SummaryLoad {
            rows_loaded,
            provision_error,
        }),
        (Err(load_error), Some(EtlError::Provision { reason, .. })) => Err(EtlError::Provision {
            table: table_name.to_string(),
            reason: format!("{}; {}", reason, load_error),
        }),
        (Err(load_error), _) => Err(load_error),
    }
}
