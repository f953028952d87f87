//! Table Builder - Provisions destination tables from inferred columns
//!
//! Used for every raw file and again for the derived summary table. The
//! statement is `CREATE TABLE IF NOT EXISTS`, so an existing table is left
//! exactly as it is: no column diffing, no error.

use crate::db::sql;
use crate::error::{EtlError, Result};
use crate::ingestion::schema_inference::ColumnDescriptor;
use sqlx::PgConnection;
use tracing::{error, info};

/// Ensure `table_name` exists with `columns`. The DDL runs outside any
/// transaction and is committed as soon as it returns.
pub async fn ensure_table(
    conn: &mut PgConnection,
    table_name: &str,
    columns: &[ColumnDescriptor],
) -> Result<()> {
    if columns.is_empty() {
        let err = EtlError::Provision {
            table: table_name.to_string(),
            reason: "no columns inferred".to_string(),
        };
        error!(table = table_name, error = %err, "Error creating table");
        return Err(err);
    }

    let ddl = sql::create_table_if_not_exists(table_name, columns);
    match sqlx::query(&ddl).execute(&mut *conn).await {
        Ok(_) => {
            info!(table = table_name, columns = columns.len(), "Table '{}' created or already exists", table_name);
            Ok(())
        }
        Err(e) => {
            let err = EtlError::Provision {
                table: table_name.to_string(),
                reason: e.to_string(),
            };
            error!(table = table_name, error = %e, "Error creating table");
            Err(err)
        }
    }
}
