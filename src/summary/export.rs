//! Point-in-time snapshot of the enriched summary

use crate::error::{EtlError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_SNAPSHOT_STEM: &str = "vendor_sales_summary";

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SnapshotFormat {
    Xlsx,
    Csv,
    Parquet,
}

impl SnapshotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Xlsx => "xlsx",
            SnapshotFormat::Csv => "csv",
            SnapshotFormat::Parquet => "parquet",
        }
    }
}

/// Writes the final rowset somewhere an operator can open it
pub trait SnapshotWriter {
    fn write_snapshot(&self, frame: &mut DataFrame, run_date: NaiveDate) -> Result<PathBuf>;
}

/// One dated file per run in `output_dir`
#[derive(Clone, Debug)]
pub struct FileSnapshotWriter {
    output_dir: PathBuf,
    format: SnapshotFormat,
    stem: String,
}

impl FileSnapshotWriter {
    pub fn new(output_dir: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            stem: DEFAULT_SNAPSHOT_STEM.to_string(),
        }
    }

    pub fn snapshot_path(&self, run_date: NaiveDate) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            self.stem,
            run_date.format("%Y-%m-%d"),
            self.format.extension()
        ))
    }

    fn write(&self, path: &Path, frame: &mut DataFrame) -> std::result::Result<(), String> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| e.to_string())?;
        match self.format {
            SnapshotFormat::Xlsx => write_workbook(path, frame)?,
            SnapshotFormat::Csv => {
                let mut file = File::create(path).map_err(|e| e.to_string())?;
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(frame)
                    .map_err(|e| e.to_string())?;
            }
            SnapshotFormat::Parquet => {
                let file = File::create(path).map_err(|e| e.to_string())?;
                ParquetWriter::new(file)
                    .finish(frame)
                    .map_err(|e| e.to_string())?;
            }
        }
        Ok(())
    }
}

/// One worksheet: a header row, then one row per frame row. Missing values
/// are left as empty cells.
fn write_workbook(path: &Path, frame: &DataFrame) -> std::result::Result<(), String> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (index, series) in frame.get_columns().iter().enumerate() {
        let col = u16::try_from(index).map_err(|_| "too many columns for a worksheet".to_string())?;
        sheet.write_string(0, col, series.name()).map_err(|e| e.to_string())?;
        write_column(sheet, col, series)?;
    }
    workbook.save(path).map_err(|e| e.to_string())
}

fn write_column(sheet: &mut Worksheet, col: u16, series: &Series) -> std::result::Result<(), String> {
    let row = |i: usize| u32::try_from(i + 1).map_err(|_| "too many rows for a worksheet".to_string());

    if series.dtype().is_numeric() {
        let numbers = series.cast(&DataType::Float64).map_err(|e| e.to_string())?;
        for (i, value) in numbers.f64().map_err(|e| e.to_string())?.into_iter().enumerate() {
            if let Some(value) = value {
                sheet.write_number(row(i)?, col, value).map_err(|e| e.to_string())?;
            }
        }
    } else {
        let text = series.cast(&DataType::String).map_err(|e| e.to_string())?;
        for (i, value) in text.str().map_err(|e| e.to_string())?.into_iter().enumerate() {
            if let Some(value) = value {
                sheet.write_string(row(i)?, col, value).map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

impl SnapshotWriter for FileSnapshotWriter {
    fn write_snapshot(&self, frame: &mut DataFrame, run_date: NaiveDate) -> Result<PathBuf> {
        let path = self.snapshot_path(run_date);
        match self.write(&path, frame) {
            Ok(()) => {
                info!(path = %path.display(), rows = frame.height(), "Data successfully saved at: {}", path.display());
                Ok(path)
            }
            Err(reason) => {
                error!(path = %path.display(), error = %reason, "Failed to write snapshot");
                Err(EtlError::Export { path, reason })
            }
        }
    }
}
