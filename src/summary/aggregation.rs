//! Vendor summary aggregation
//!
//! Three grouped aggregates joined on the purchase side:
//! - purchases (priced > 0) joined to purchase_prices, grouped by the full product key
//! - sales grouped by (vendor, brand), left-joined
//! - freight grouped by vendor, left-joined
//!
//! The result is read through a server-side cursor in fixed-size batches.

use crate::error::{EtlError, Result};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::{error, info};

pub const DEFAULT_FETCH_BATCH_SIZE: usize = 50_000;

const CURSOR_NAME: &str = "vendor_summary_cursor";

/// Every output column is cast so decoding does not depend on the types the
/// raw tables were inferred with.
pub const VENDOR_SUMMARY_SQL: &str = r#"
WITH freight_summary AS (
    SELECT "VendorNumber", SUM("Freight") AS total_freight
    FROM vendor_invoice
    GROUP BY "VendorNumber"
),
purchase_summary AS (
    SELECT p."VendorNumber", p."VendorName", p."Brand", p."Description",
           p."PurchasePrice", pp."Volume", pp."Price" AS actual_price,
           SUM(p."Quantity") AS total_quantity,
           SUM(p."Dollars") AS total_purchase_dollars
    FROM purchases p
    JOIN purchase_prices pp ON pp."Brand" = p."Brand"
    WHERE p."PurchasePrice" > 0
    GROUP BY p."VendorNumber", p."VendorName", p."Brand", p."Description",
             p."PurchasePrice", pp."Volume", pp."Price"
),
sales_summary AS (
    SELECT "VendorNo" AS "VendorNumber", "Brand",
           SUM("SalesPrice") AS total_sales_price,
           SUM("SalesQuantity") AS total_sales_quantity,
           SUM("SalesDollars") AS total_sales_dollars,
           SUM("ExciseTax") AS total_excise_tax
    FROM sales
    GROUP BY "VendorNo", "Brand"
)
SELECT ps."VendorNumber"::BIGINT AS vendor_number,
       ps."VendorName"::TEXT AS vendor_name,
       ps."Brand"::BIGINT AS brand,
       ps."Description"::TEXT AS description,
       ps."PurchasePrice"::DOUBLE PRECISION AS purchase_price,
       ps."Volume"::DOUBLE PRECISION AS volume,
       ps.actual_price::DOUBLE PRECISION AS actual_price,
       ps.total_quantity::DOUBLE PRECISION AS total_quantity_purchased,
       ps.total_purchase_dollars::DOUBLE PRECISION AS total_purchase_dollars,
       ss.total_sales_price::DOUBLE PRECISION AS total_sales_price,
       ss.total_sales_quantity::DOUBLE PRECISION AS total_sales_quantity,
       ss.total_sales_dollars::DOUBLE PRECISION AS total_sales_dollars,
       ss.total_excise_tax::DOUBLE PRECISION AS total_excise_tax,
       fs.total_freight::DOUBLE PRECISION AS total_freight
FROM purchase_summary ps
LEFT JOIN sales_summary ss
       ON ps."VendorNumber" = ss."VendorNumber" AND ps."Brand" = ss."Brand"
LEFT JOIN freight_summary fs
       ON ps."VendorNumber" = fs."VendorNumber"
ORDER BY ss.total_sales_dollars DESC NULLS LAST
"#;

/// One row as it comes back from the store. Sales and freight columns are
/// `None` when the outer join found nothing.
#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct VendorSummaryRecord {
    pub vendor_number: Option<i64>,
    pub vendor_name: Option<String>,
    pub brand: Option<i64>,
    pub description: Option<String>,
    pub purchase_price: Option<f64>,
    pub volume: Option<f64>,
    pub actual_price: Option<f64>,
    pub total_quantity_purchased: Option<f64>,
    pub total_purchase_dollars: Option<f64>,
    pub total_sales_price: Option<f64>,
    pub total_sales_quantity: Option<f64>,
    pub total_sales_dollars: Option<f64>,
    pub total_excise_tax: Option<f64>,
    pub total_freight: Option<f64>,
}

/// Run the summary query and collect it batch by batch.
pub async fn compute_vendor_summary(
    conn: &mut PgConnection,
    batch_size: usize,
) -> Result<Vec<VendorSummaryRecord>> {
    info!("Starting vendor summary SQL query...");
    match fetch_in_batches(conn, batch_size.max(1)).await {
        Ok(records) => {
            info!(rows = records.len(), "Total {} rows fetched", records.len());
            Ok(records)
        }
        Err(e) => {
            error!(error = %e, "Vendor summary query failed");
            Err(EtlError::Aggregation(e))
        }
    }
}

async fn fetch_in_batches(
    conn: &mut PgConnection,
    batch_size: usize,
) -> std::result::Result<Vec<VendorSummaryRecord>, sqlx::Error> {
    // Cursors only live inside a transaction
    let mut tx = conn.begin().await?;

    let declare = format!("DECLARE {} NO SCROLL CURSOR FOR {}", CURSOR_NAME, VENDOR_SUMMARY_SQL);
    sqlx::raw_sql(&declare).execute(&mut *tx).await?;

    let fetch = format!("FETCH FORWARD {} FROM {}", batch_size, CURSOR_NAME);
    let mut records = Vec::new();
    loop {
        let batch: Vec<VendorSummaryRecord> = sqlx::query_as(&fetch)
            .persistent(false)
            .fetch_all(&mut *tx)
            .await?;
        if batch.is_empty() {
            break;
        }
        info!(rows = batch.len(), "Fetched {} rows in a batch", batch.len());
        let last_batch = batch.len() < batch_size;
        records.extend(batch);
        if last_batch {
            break;
        }
    }

    sqlx::raw_sql(&format!("CLOSE {}", CURSOR_NAME)).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    #[test]
    fn test_summary_query_is_single_statement() {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, VENDOR_SUMMARY_SQL).unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_no_sales_sort_last() {
        assert!(VENDOR_SUMMARY_SQL.contains("ORDER BY ss.total_sales_dollars DESC NULLS LAST"));
    }

    #[test]
    fn test_purchase_side_is_the_anchor() {
        let from = VENDOR_SUMMARY_SQL.find("FROM purchase_summary ps").unwrap();
        let sales_join = VENDOR_SUMMARY_SQL.find("LEFT JOIN sales_summary ss").unwrap();
        let freight_join = VENDOR_SUMMARY_SQL.find("LEFT JOIN freight_summary fs").unwrap();
        assert!(from < sales_join && sales_join < freight_join);
        assert!(VENDOR_SUMMARY_SQL.contains("WHERE p.\"PurchasePrice\" > 0"));
    }
}
