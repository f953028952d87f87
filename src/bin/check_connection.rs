//! Check the PostgreSQL connection and the source tables the summary reads
//!
//! Run with: cargo run --bin check_connection

use vendor_etl::db::{self, StoreConfig};
use vendor_etl::ingestion::bulk_loader::count_rows;

const SOURCE_TABLES: [&str; 4] = ["purchases", "purchase_prices", "sales", "vendor_invoice"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    println!("Testing PostgreSQL connection...\n");

    let config = StoreConfig::from_env()?;
    println!("Connecting to: {}", config.target());

    let mut conn = match db::connect(&config).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Connection failed: {}", e);
            eprintln!("   Set DATABASE_URL or PGHOST/PGPORT/PGDATABASE/PGUSER/PGPASSWORD in .env");
            return Err(e.into());
        }
    };
    println!("Connected successfully!\n");

    let schema = config.schema.as_deref().unwrap_or("public");
    let table_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1",
    )
    .bind(schema)
    .fetch_one(&mut conn)
    .await?;
    println!("   Tables in schema '{}': {}", schema, table_count);

    let mut missing = 0;
    for table in SOURCE_TABLES {
        match count_rows(&mut conn, table).await {
            Ok(count) => println!("   {}: {} rows", table, count),
            Err(e) => {
                missing += 1;
                println!("   {}: not found or unreadable ({})", table, e);
            }
        }
    }

    db::close(conn).await;

    if missing > 0 {
        println!("\n{} source table(s) missing; run `vendor-etl ingest` first", missing);
    } else {
        println!("\nAll source tables present");
    }
    Ok(())
}
