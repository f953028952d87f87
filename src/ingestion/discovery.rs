//! Input discovery - which files get ingested and under what table name

use crate::error::{EtlError, Result};
use std::path::{Path, PathBuf};

/// A CSV file and the table it loads into
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub table_name: String,
}

/// Lower-cased file stem, e.g. `Purchase_Prices.csv` -> `purchase_prices`
pub fn table_name_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_lowercase())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Every `.csv` file directly inside `dir`, sorted by file name.
/// Subdirectories and other extensions are skipped.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let discovery_error = |source: std::io::Error| EtlError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_error)? {
        let path = entry.map_err(discovery_error)?.path();
        if !path.is_file() || !is_csv(&path) {
            continue;
        }
        if let Some(table_name) = table_name_for(&path) {
            files.push(SourceFile { path, table_name });
        }
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for() {
        assert_eq!(table_name_for(Path::new("data/Purchase_Prices.csv")), Some("purchase_prices".to_string()));
        assert_eq!(table_name_for(Path::new("vendor_invoice.csv")), Some("vendor_invoice".to_string()));
        assert_eq!(table_name_for(Path::new("SALES.CSV")), Some("sales".to_string()));
        assert_eq!(table_name_for(Path::new("archive.2024.csv")), Some("archive.2024".to_string()));
    }

    #[test]
    fn test_discover_only_csv_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["sales.csv", "Purchases.CSV", "notes.txt", "begin_inventory.csv"] {
            std::fs::write(dir.path().join(name), "a,b\n1,2\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = discover_csv_files(dir.path()).unwrap();
        let tables: Vec<&str> = files.iter().map(|f| f.table_name.as_str()).collect();
        // byte order of file names: uppercase sorts first
        assert_eq!(tables, vec!["purchases", "begin_inventory", "sales"]);
    }

    #[test]
    fn test_missing_directory_is_discovery_error() {
        let err = discover_csv_files(Path::new("/no/such/input/dir")).unwrap_err();
        assert!(matches!(err, EtlError::Discovery { .. }));
    }
}
