use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use vendor_etl::logging::init_logging;
use vendor_etl::summary::SnapshotFormat;
use vendor_etl::{FileSnapshotWriter, Pipeline, PipelineConfig, RunMode, RunReport, StoreConfig};

#[derive(Parser)]
#[command(name = "vendor-etl")]
#[command(about = "Load inventory CSV extracts into PostgreSQL and build the vendor sales summary")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the raw .csv files
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Directory the dated summary snapshot is written to
    #[arg(short, long, default_value = "output", global = true)]
    output_dir: PathBuf,

    /// Write logs to db_load_<date>.log in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Rows per cursor fetch while reading the summary
    #[arg(long, default_value_t = vendor_etl::summary::DEFAULT_FETCH_BATCH_SIZE, global = true)]
    fetch_batch_size: usize,

    /// Only scan this many rows per CSV file to settle column types (default: every row)
    #[arg(long, global = true)]
    infer_schema_rows: Option<usize>,

    #[arg(long, value_enum, default_value = "xlsx", global = true)]
    snapshot_format: SnapshotFormat,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Load every CSV in the data directory into its own table
    Ingest,
    /// Build, persist and export the vendor summary from already-loaded tables
    Summarize,
    /// Ingest, then summarize
    Run,
}

impl From<Command> for RunMode {
    fn from(command: Command) -> Self {
        match command {
            Command::Ingest => RunMode::Ingest,
            Command::Summarize => RunMode::Summarize,
            Command::Run => RunMode::Full,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_dir.as_deref()).context("failed to set up logging")?;

    let store = StoreConfig::from_env()?;
    let config = PipelineConfig::new(&args.data_dir, store)
        .with_fetch_batch_size(args.fetch_batch_size)
        .with_infer_schema_rows(args.infer_schema_rows);
    let writer = FileSnapshotWriter::new(&args.output_dir, args.snapshot_format);
    let mode: RunMode = args.command.unwrap_or(Command::Run).into();

    info!(data_dir = %args.data_dir.display(), ?mode, "Vendor ETL starting");

    match Pipeline::new(&config, &writer).run(mode).await {
        Ok(report) => {
            print_report(&report, args.json)?;
            Ok(())
        }
        Err(failure) => {
            print_report(&failure.report, args.json)?;
            Err(failure.into())
        }
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if let Some(ingestion) = &report.ingestion {
        println!(
            "Files loaded: {}/{} ({} rows)",
            ingestion.loaded_count(),
            ingestion.files.len(),
            ingestion.total_rows()
        );
        for failure in ingestion.failures() {
            println!(
                "  {} not loaded ({:?}): {}",
                failure.path.display(),
                failure.status,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if let Some(rows) = report.summary_rows {
        println!("Vendor summary rows: {}", rows);
    }
    match (report.summary_rows_loaded, &report.summary_error) {
        (Some(rows), Some(reason)) => println!("Summary table loaded ({} rows) after: {}", rows, reason),
        (Some(rows), None) => println!("Summary table loaded ({} rows)", rows),
        (None, Some(reason)) => println!("Summary table not persisted: {}", reason),
        (None, None) => {}
    }
    if let Some(path) = &report.snapshot {
        println!("Snapshot: {}", path.display());
    }
    Ok(())
}
