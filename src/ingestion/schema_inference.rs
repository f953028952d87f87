//! Schema Inference - Deterministic storage types from parsed CSV columns

use crate::error::{EtlError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the CSV sampler observed in a column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Real,
    Boolean,
    Timestamp,
    Text,
    /// Every sampled value was missing
    Null,
}

impl From<&DataType> for ValueKind {
    fn from(dtype: &DataType) -> Self {
        if dtype.is_integer() {
            ValueKind::Integer
        } else if dtype.is_float() {
            ValueKind::Real
        } else {
            match dtype {
                DataType::Boolean => ValueKind::Boolean,
                DataType::Date | DataType::Datetime(_, _) => ValueKind::Timestamp,
                DataType::Null => ValueKind::Null,
                _ => ValueKind::Text,
            }
        }
    }
}

/// Column type in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Integer64,
    Float64,
    Boolean,
    Timestamp,
    Text,
}

impl StorageType {
    pub fn for_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => StorageType::Integer64,
            ValueKind::Real => StorageType::Float64,
            ValueKind::Boolean => StorageType::Boolean,
            ValueKind::Timestamp => StorageType::Timestamp,
            ValueKind::Text | ValueKind::Null => StorageType::Text,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageType::Integer64 => "BIGINT",
            StorageType::Float64 => "DOUBLE PRECISION",
            StorageType::Boolean => "BOOLEAN",
            StorageType::Timestamp => "TIMESTAMP",
            StorageType::Text => "TEXT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub storage_type: StorageType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
        }
    }
}

/// One descriptor per column, in schema order
pub fn columns_from_schema(schema: &Schema) -> Vec<ColumnDescriptor> {
    schema
        .iter()
        .map(|(name, dtype)| ColumnDescriptor::new(name.as_str(), StorageType::for_kind(ValueKind::from(dtype))))
        .collect()
}

/// One descriptor per column, in frame order
pub fn infer_columns(df: &DataFrame) -> Vec<ColumnDescriptor> {
    columns_from_schema(&df.schema())
}

/// Works out a CSV file's column types without materializing its rows.
///
/// By default every row is scanned, so a late value that does not fit the
/// earlier ones widens the column (integer -> float -> text). With a sample
/// limit only the first `n` rows are looked at; values past the sample must
/// then fit, or the load rejects them.
#[derive(Clone, Debug)]
pub struct SchemaInference {
    sample_rows: Option<usize>,
    try_parse_dates: bool,
}

impl SchemaInference {
    pub fn new() -> Self {
        Self {
            sample_rows: None,
            try_parse_dates: true,
        }
    }

    pub fn with_sample_rows(mut self, sample_rows: Option<usize>) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    pub fn with_date_parsing(mut self, enabled: bool) -> Self {
        self.try_parse_dates = enabled;
        self
    }

    pub fn infer_file_columns(&self, path: &Path) -> Result<Vec<ColumnDescriptor>> {
        let parse_error = |source: PolarsError| EtlError::Parse {
            path: PathBuf::from(path),
            source,
        };

        let schema = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(self.sample_rows)
            .with_try_parse_dates(self.try_parse_dates)
            .finish()
            .map_err(parse_error)?
            .schema()
            .map_err(parse_error)?;
        Ok(columns_from_schema(&schema))
    }
}

impl Default for SchemaInference {
    fn default() -> Self {
        Self::new()
    }
}
