use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Failed to read input directory '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("Error creating table '{table}': {reason}")]
    Provision { table: String, reason: String },

    #[error("Error loading data into '{table}': {reason}")]
    Load { table: String, reason: String },

    #[error("Vendor summary query failed: {0}")]
    Aggregation(#[source] sqlx::Error),

    #[error("Failed to shape summary frame: {0}")]
    Frame(#[source] polars::error::PolarsError),

    #[error("Failed to write snapshot '{}': {reason}", path.display())]
    Export { path: PathBuf, reason: String },
}

impl EtlError {
    /// Fatal errors abort the run; the rest are logged and the run moves on.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EtlError::Provision { .. } | EtlError::Load { .. } | EtlError::Parse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
