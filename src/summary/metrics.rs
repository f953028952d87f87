//! Profitability metrics over summary rows
//!
//! Everything here is a pure function of one row, so it can be tested without
//! a store. Division is guarded: a non-positive denominator yields 0.

use crate::summary::aggregation::VendorSummaryRecord;
use serde::{Deserialize, Serialize};

/// Cleaned and enriched summary row. Field order is the column order of the
/// persisted table and of the snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub vendor_number: i64,
    pub vendor_name: String,
    pub brand: i64,
    pub description: String,
    pub purchase_price: f64,
    pub volume: f64,
    pub actual_price: f64,
    pub total_quantity_purchased: f64,
    pub total_purchase_dollars: f64,
    pub total_sales_price: f64,
    pub total_sales_quantity: f64,
    pub total_sales_dollars: f64,
    pub total_excise_tax: f64,
    pub total_freight: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,
    pub stock_turnover: f64,
    pub sales_to_purchase_ratio: f64,
}

pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn gross_profit(total_sales_dollars: f64, total_purchase_dollars: f64) -> f64 {
    total_sales_dollars - total_purchase_dollars
}

/// Percentage of sales kept as profit
pub fn profit_margin(gross_profit: f64, total_sales_dollars: f64) -> f64 {
    if total_sales_dollars > 0.0 {
        gross_profit / total_sales_dollars * 100.0
    } else {
        0.0
    }
}

pub fn stock_turnover(total_sales_quantity: f64, total_quantity_purchased: f64) -> f64 {
    guarded_div(total_sales_quantity, total_quantity_purchased)
}

pub fn sales_to_purchase_ratio(total_sales_dollars: f64, total_purchase_dollars: f64) -> f64 {
    guarded_div(total_sales_dollars, total_purchase_dollars)
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

impl From<VendorSummaryRecord> for VendorSummary {
    fn from(record: VendorSummaryRecord) -> Self {
        let total_quantity_purchased = record.total_quantity_purchased.unwrap_or(0.0);
        let total_purchase_dollars = record.total_purchase_dollars.unwrap_or(0.0);
        let total_sales_quantity = record.total_sales_quantity.unwrap_or(0.0);
        let total_sales_dollars = record.total_sales_dollars.unwrap_or(0.0);
        let gross_profit = gross_profit(total_sales_dollars, total_purchase_dollars);

        Self {
            vendor_number: record.vendor_number.unwrap_or(0),
            vendor_name: trimmed(record.vendor_name),
            brand: record.brand.unwrap_or(0),
            description: trimmed(record.description),
            purchase_price: record.purchase_price.unwrap_or(0.0),
            volume: record.volume.unwrap_or(0.0),
            actual_price: record.actual_price.unwrap_or(0.0),
            total_quantity_purchased,
            total_purchase_dollars,
            total_sales_price: record.total_sales_price.unwrap_or(0.0),
            total_sales_quantity,
            total_sales_dollars,
            total_excise_tax: record.total_excise_tax.unwrap_or(0.0),
            total_freight: record.total_freight.unwrap_or(0.0),
            gross_profit,
            profit_margin: profit_margin(gross_profit, total_sales_dollars),
            stock_turnover: stock_turnover(total_sales_quantity, total_quantity_purchased),
            sales_to_purchase_ratio: sales_to_purchase_ratio(total_sales_dollars, total_purchase_dollars),
        }
    }
}

/// Zero-fill, trim and enrich every row. Order is preserved.
pub fn derive_metrics(records: Vec<VendorSummaryRecord>) -> Vec<VendorSummary> {
    records.into_iter().map(VendorSummary::from).collect()
}
