//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the default `info` filter. With a log directory the
//! output goes to `db_load_<date>.log` there instead of stderr, appended across
//! runs on the same day.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("db_load_{}.log", Local::now().format("%Y-%m-%d")))
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// subscriber is simply not installed.
pub fn init_logging(log_dir: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()));

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(dir))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_dated() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("db_load_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "db_load_2026-10-16.log".len());
    }

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        init_logging(Some(&log_dir)).unwrap();
        assert!(log_dir.is_dir());
        assert!(log_file_path(&log_dir).exists());
    }
}
