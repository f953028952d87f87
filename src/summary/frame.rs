//! Tabular forms of the enriched summary: a polars frame for schema
//! inference and the snapshot, and a CSV buffer for the bulk COPY.

use crate::error::{EtlError, Result};
use crate::summary::metrics::VendorSummary;
use polars::prelude::*;

pub const SUMMARY_COLUMNS: [&str; 18] = [
    "vendor_number",
    "vendor_name",
    "brand",
    "description",
    "purchase_price",
    "volume",
    "actual_price",
    "total_quantity_purchased",
    "total_purchase_dollars",
    "total_sales_price",
    "total_sales_quantity",
    "total_sales_dollars",
    "total_excise_tax",
    "total_freight",
    "gross_profit",
    "profit_margin",
    "stock_turnover",
    "sales_to_purchase_ratio",
];

fn floats(rows: &[VendorSummary], field: impl Fn(&VendorSummary) -> f64) -> Vec<f64> {
    rows.iter().map(field).collect()
}

/// Columns follow `SUMMARY_COLUMNS`. An empty slice gives a zero-row frame
/// with the same schema.
pub fn summary_frame(rows: &[VendorSummary]) -> Result<DataFrame> {
    df!(
        "vendor_number" => rows.iter().map(|r| r.vendor_number).collect::<Vec<i64>>(),
        "vendor_name" => rows.iter().map(|r| r.vendor_name.as_str()).collect::<Vec<&str>>(),
        "brand" => rows.iter().map(|r| r.brand).collect::<Vec<i64>>(),
        "description" => rows.iter().map(|r| r.description.as_str()).collect::<Vec<&str>>(),
        "purchase_price" => floats(rows, |r| r.purchase_price),
        "volume" => floats(rows, |r| r.volume),
        "actual_price" => floats(rows, |r| r.actual_price),
        "total_quantity_purchased" => floats(rows, |r| r.total_quantity_purchased),
        "total_purchase_dollars" => floats(rows, |r| r.total_purchase_dollars),
        "total_sales_price" => floats(rows, |r| r.total_sales_price),
        "total_sales_quantity" => floats(rows, |r| r.total_sales_quantity),
        "total_sales_dollars" => floats(rows, |r| r.total_sales_dollars),
        "total_excise_tax" => floats(rows, |r| r.total_excise_tax),
        "total_freight" => floats(rows, |r| r.total_freight),
        "gross_profit" => floats(rows, |r| r.gross_profit),
        "profit_margin" => floats(rows, |r| r.profit_margin),
        "stock_turnover" => floats(rows, |r| r.stock_turnover),
        "sales_to_purchase_ratio" => floats(rows, |r| r.sales_to_purchase_ratio)
    )
    .map_err(EtlError::Frame)
}

/// Header plus one CSV record per row, ready for `COPY ... WITH (FORMAT csv, HEADER true)`
pub fn summary_csv(rows: &[VendorSummary], table_name: &str) -> Result<Vec<u8>> {
    let load_error = |reason: String| EtlError::Load {
        table: table_name.to_string(),
        reason,
    };

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(SUMMARY_COLUMNS)
        .map_err(|e| load_error(e.to_string()))?;
    for row in rows {
        writer.serialize(row).map_err(|e| load_error(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| load_error(e.to_string()))
}
