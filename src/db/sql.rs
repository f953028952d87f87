//! SQL statement builders shared by provisioning, loading and aggregation.
//!
//! Identifiers are always emitted double-quoted so file-derived table names
//! and CSV headers survive reserved words, spaces and mixed case.

use crate::ingestion::schema_inference::ColumnDescriptor;
use itertools::Itertools;
use sqlparser::ast::Ident;

/// Quote an identifier for PostgreSQL, doubling any embedded `"`.
pub fn quote_identifier(name: &str) -> String {
    Ident::with_quote('"', name).to_string()
}

/// `CREATE TABLE IF NOT EXISTS "t" ("a" BIGINT, "b" TEXT)`
pub fn create_table_if_not_exists(table_name: &str, columns: &[ColumnDescriptor]) -> String {
    let column_defs = columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.storage_type.as_sql()))
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table_name),
        column_defs
    )
}

/// Header-aware CSV `COPY ... FROM STDIN`. The header row is consumed by the store.
pub fn copy_from_stdin_csv(table_name: &str) -> String {
    format!(
        "COPY {} FROM STDIN WITH (FORMAT csv, HEADER true, DELIMITER ',')",
        quote_identifier(table_name)
    )
}

pub fn count_rows(table_name: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name))
}
