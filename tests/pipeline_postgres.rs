//! End-to-end checks against a live PostgreSQL server.
//!
//! Set `VENDOR_ETL_TEST_DATABASE_URL` to run them; each test works inside its
//! own throwaway schema. Without the variable every test returns early.

use sqlx::Connection;
use std::fs;
use std::path::Path;
use vendor_etl::db::{self, StoreConfig};
use vendor_etl::ingestion::bulk_loader::count_rows;
use vendor_etl::ingestion::{bulk_load, ensure_table, ColumnDescriptor, StorageType};
use vendor_etl::summary::{compute_vendor_summary, derive_metrics};
use vendor_etl::{FileSnapshotWriter, Pipeline, PipelineConfig, RunMode, SnapshotFormat};

const PURCHASES: &str = "\
VendorNumber,VendorName,Brand,Description,PurchasePrice,Quantity,Dollars
10,ALPHA SPIRITS  ,1001,Gin 750,5.0,100,500.0
10,ALPHA SPIRITS  ,1001,Gin 750,5.0,100,500.0
20,BETA WINES,2002,Red Blend,10.0,50,500.0
30,GAMMA IMPORTS,3003,Vodka 1L,8.0,20,160.0
40,FREEBIE CO,4004,Sample,0.0,5,0.0
";

const PURCHASE_PRICES: &str = "\
Brand,Volume,Price
1001,750,12.99
2002,750,19.99
3003,1000,15.49
4004,50,0.0
";

const SALES: &str = "\
VendorNo,Brand,SalesPrice,SalesQuantity,SalesDollars,ExciseTax
10,1001,12.99,80,1039.2,10.0
10,1001,12.99,70,909.3,9.0
20,2002,19.99,10,199.9,2.0
";

const VENDOR_INVOICE: &str = "\
VendorNumber,Freight
10,25.5
10,4.5
20,12.0
";

fn test_database_url() -> Option<String> {
    std::env::var("VENDOR_ETL_TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Fresh schema on the test server; dropped by [`TestSchema::drop_schema`]
struct TestSchema {
    base: StoreConfig,
    name: String,
}

impl TestSchema {
    async fn create(url: &str) -> Self {
        let base = StoreConfig::from_lookup(|key| (key == "DATABASE_URL").then(|| url.to_string())).unwrap();
        let name = format!("vendor_etl_test_{}", uuid::Uuid::new_v4().simple());
        let mut conn = db::connect(&base).await.unwrap();
        sqlx::raw_sql(&format!("CREATE SCHEMA \"{}\"", name))
            .execute(&mut conn)
            .await
            .unwrap();
        db::close(conn).await;
        Self { base, name }
    }

    fn store(&self) -> StoreConfig {
        self.base.clone().with_schema(self.name.clone())
    }

    async fn drop_schema(self) {
        let mut conn = db::connect(&self.base).await.unwrap();
        sqlx::raw_sql(&format!("DROP SCHEMA \"{}\" CASCADE", self.name))
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
    }
}

fn write_source_files(dir: &Path) {
    fs::write(dir.join("purchases.csv"), PURCHASES).unwrap();
    fs::write(dir.join("purchase_prices.csv"), PURCHASE_PRICES).unwrap();
    fs::write(dir.join("sales.csv"), SALES).unwrap();
    fs::write(dir.join("vendor_invoice.csv"), VENDOR_INVOICE).unwrap();
}

#[tokio::test]
async fn test_ensure_table_is_idempotent_and_load_counts_rows() {
    let Some(url) = test_database_url() else {
        eprintln!("VENDOR_ETL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let schema = TestSchema::create(&url).await;
    let mut conn = db::connect(&schema.store()).await.unwrap();

    let columns = vec![
        ColumnDescriptor::new("id", StorageType::Integer64),
        ColumnDescriptor::new("name", StorageType::Text),
    ];
    ensure_table(&mut conn, "widgets", &columns).await.unwrap();
    ensure_table(&mut conn, "widgets", &columns).await.unwrap();

    let csv = "id,name\n1,bolt\n2,nut\n3,washer\n";
    let loaded = bulk_load(&mut conn, "widgets", csv.as_bytes()).await.unwrap();
    assert_eq!(loaded, 3);
    assert_eq!(count_rows(&mut conn, "widgets").await.unwrap(), 3);

    let stored: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM widgets ORDER BY id")
        .fetch_all(&mut conn)
        .await
        .unwrap();
    assert_eq!(
        stored,
        vec![(1, "bolt".to_string()), (2, "nut".to_string()), (3, "washer".to_string())]
    );

    // Loads append
    bulk_load(&mut conn, "widgets", csv.as_bytes()).await.unwrap();
    assert_eq!(count_rows(&mut conn, "widgets").await.unwrap(), 6);

    db::close(conn).await;
    schema.drop_schema().await;
}

#[tokio::test]
async fn test_load_into_mismatched_table_is_rolled_back() {
    let Some(url) = test_database_url() else {
        eprintln!("VENDOR_ETL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let schema = TestSchema::create(&url).await;
    let mut conn = db::connect(&schema.store()).await.unwrap();

    let columns = vec![ColumnDescriptor::new("id", StorageType::Integer64)];
    ensure_table(&mut conn, "numbers", &columns).await.unwrap();

    let err = bulk_load(&mut conn, "numbers", "id\n1\nnot-a-number\n".as_bytes())
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(count_rows(&mut conn, "numbers").await.unwrap(), 0);

    db::close(conn).await;
    schema.drop_schema().await;
}

#[tokio::test]
async fn test_large_file_with_late_decimal_loads_every_row() {
    let Some(url) = test_database_url() else {
        eprintln!("VENDOR_ETL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let schema = TestSchema::create(&url).await;
    let data_dir = tempfile::tempdir().unwrap();

    let mut body = String::from("Brand,ExciseTax\n");
    for i in 0..10_050 {
        body.push_str(&format!("{},1\n", i));
    }
    body.push_str("5,0.79\n");
    fs::write(data_dir.path().join("sales.csv"), body).unwrap();

    let config = PipelineConfig::new(data_dir.path(), schema.store());
    let writer = FileSnapshotWriter::new(data_dir.path().join("out"), SnapshotFormat::Csv);
    let report = Pipeline::new(&config, &writer).run(RunMode::Ingest).await.unwrap();
    let ingestion = report.ingestion.unwrap();
    assert_eq!(ingestion.failed_count(), 0);
    assert_eq!(ingestion.total_rows(), 10_051);

    let mut conn = db::connect(&schema.store()).await.unwrap();
    let tax: f64 = sqlx::query_scalar("SELECT SUM(\"ExciseTax\") FROM sales WHERE \"Brand\" = 5")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert!((tax - 1.79).abs() < 1e-9);
    db::close(conn).await;

    schema.drop_schema().await;
}

#[tokio::test]
async fn test_summary_keeps_unsold_purchases_and_sorts_them_last() {
    let Some(url) = test_database_url() else {
        eprintln!("VENDOR_ETL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let schema = TestSchema::create(&url).await;
    let data_dir = tempfile::tempdir().unwrap();
    write_source_files(data_dir.path());

    let config = PipelineConfig::new(data_dir.path(), schema.store());
    let writer = FileSnapshotWriter::new(data_dir.path().join("out"), SnapshotFormat::Csv);
    let report = Pipeline::new(&config, &writer).run(RunMode::Ingest).await.unwrap();
    let ingestion = report.ingestion.unwrap();
    assert_eq!(ingestion.loaded_count(), 4);
    assert_eq!(ingestion.failed_count(), 0);

    let mut conn = db::connect(&schema.store()).await.unwrap();
    // Batch size 1 forces several FETCH round trips
    let records = compute_vendor_summary(&mut conn, 1).await.unwrap();
    db::close(conn).await;

    // Vendor 40 only has zero-priced purchases and is filtered out
    assert_eq!(records.len(), 3);
    let vendors: Vec<i64> = records.iter().map(|r| r.vendor_number.unwrap()).collect();
    assert_eq!(vendors, vec![10, 20, 30]);

    let unsold = &records[2];
    assert!(unsold.total_sales_dollars.is_none());
    assert!(unsold.total_freight.is_none());

    let rows = derive_metrics(records);
    let alpha = &rows[0];
    assert_eq!(alpha.vendor_name, "ALPHA SPIRITS");
    assert_eq!(alpha.total_quantity_purchased, 200.0);
    assert_eq!(alpha.total_purchase_dollars, 1000.0);
    assert!((alpha.total_sales_dollars - 1948.5).abs() < 1e-9);
    assert!((alpha.total_freight - 30.0).abs() < 1e-9);
    assert!((alpha.gross_profit - 948.5).abs() < 1e-9);
    assert!((alpha.stock_turnover - 0.75).abs() < 1e-9);

    let gamma = &rows[2];
    assert_eq!(gamma.total_sales_dollars, 0.0);
    assert_eq!(gamma.gross_profit, -160.0);
    assert_eq!(gamma.profit_margin, 0.0);
    assert_eq!(gamma.stock_turnover, 0.0);

    schema.drop_schema().await;
}

#[tokio::test]
async fn test_full_run_persists_summary_and_writes_snapshot() {
    let Some(url) = test_database_url() else {
        eprintln!("VENDOR_ETL_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let schema = TestSchema::create(&url).await;
    let data_dir = tempfile::tempdir().unwrap();
    write_source_files(data_dir.path());
    // Not a CSV: ignored by discovery
    fs::write(data_dir.path().join("notes.txt"), "ignore me").unwrap();
    // Ragged rows: recorded as a failure and skipped
    fs::write(data_dir.path().join("broken.csv"), "a,b\n1,2,3,4\n\"unterminated\n").unwrap();

    let output_dir = data_dir.path().join("out");
    let config = PipelineConfig::new(data_dir.path(), schema.store()).with_fetch_batch_size(2);
    let writer = FileSnapshotWriter::new(&output_dir, SnapshotFormat::Csv);
    let report = Pipeline::new(&config, &writer).run(RunMode::Full).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.summary_rows, Some(3));
    assert_eq!(report.summary_rows_loaded, Some(3));
    assert!(report.summary_error.is_none());

    let ingestion = report.ingestion.as_ref().unwrap();
    let tables: Vec<&str> = ingestion.files.iter().map(|f| f.table_name.as_str()).collect();
    assert!(!tables.contains(&"notes"));
    assert_eq!(ingestion.loaded_count(), 4);
    assert_eq!(ingestion.failed_count(), 1);
    assert_eq!(report.non_fatal_failures(), 1);

    let snapshot = report.snapshot.as_ref().unwrap();
    assert!(snapshot.starts_with(&output_dir));
    let written = fs::read_to_string(snapshot).unwrap();
    assert!(written.starts_with("vendor_number,vendor_name,brand,"));
    assert_eq!(written.lines().count(), 4);

    let mut conn = db::connect(&schema.store()).await.unwrap();
    assert_eq!(count_rows(&mut conn, "vendor_sales_summary").await.unwrap(), 3);
    db::close(conn).await;

    schema.drop_schema().await;
}
