//! Bulk Loader - Streams CSV rows into a table with a single COPY
//!
//! Each call runs in its own transaction: the whole source is committed or
//! none of it is. The source is forwarded in fixed-size chunks so a large
//! file never has to fit in memory.

use crate::db::sql;
use crate::error::{EtlError, Result};
use sqlx::{Connection, PgConnection};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
enum CopyError {
    #[error(transparent)]
    Store(#[from] sqlx::Error),

    #[error("failed to read row source: {0}")]
    Source(#[from] std::io::Error),
}

/// Copy a header-delimited, comma-separated row source into `table_name`.
/// Returns the number of rows the store reports as copied.
pub async fn bulk_load<R>(conn: &mut PgConnection, table_name: &str, source: R) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    match copy_csv(conn, table_name, source).await {
        Ok(rows) => {
            info!(table = table_name, rows, "Data loaded successfully into '{}'", table_name);
            Ok(rows)
        }
        Err(e) => {
            error!(table = table_name, error = %e, "Error loading data into '{}'", table_name);
            Err(EtlError::Load {
                table: table_name.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Open `path` and hand it to [`bulk_load`]
pub async fn bulk_load_file(conn: &mut PgConnection, table_name: &str, path: &Path) -> Result<u64> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            error!(table = table_name, path = %path.display(), error = %e, "Error loading data into '{}'", table_name);
            return Err(EtlError::Load {
                table: table_name.to_string(),
                reason: format!("failed to open {}: {}", path.display(), e),
            });
        }
    };
    bulk_load(conn, table_name, file).await
}

async fn copy_csv<R>(conn: &mut PgConnection, table_name: &str, mut source: R) -> std::result::Result<u64, CopyError>
where
    R: AsyncRead + Unpin,
{
    let mut tx = conn.begin().await?;
    let mut copy = tx.copy_in_raw(&sql::copy_from_stdin_csv(table_name)).await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0usize;
    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                copy.abort(e.to_string()).await?;
                return Err(CopyError::Source(e));
            }
        };
        copy.send(&buf[..n]).await?;
        sent += n;
    }
    debug!(table = table_name, bytes = sent, "COPY stream finished");

    let rows = copy.finish().await?;
    tx.commit().await?;
    Ok(rows)
}

pub async fn count_rows(conn: &mut PgConnection, table_name: &str) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&sql::count_rows(table_name))
        .fetch_one(&mut *conn)
        .await
}
