// 📂 Ingestion - CSV files to raw rows
// Readers only split columns; typing and rejection happen in the pipeline so
// a bad value is reported with its table, row and field.

use crate::records::{
    ProductCatalog, RawCampaignRow, RawDemographicRow, RawProductRow, RawRedemptionRow,
    RawTransactionRow,
};
use anyhow::{Context as AnyhowContext, Result};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read every row of a CSV with headers
pub fn read_rows<T, R>(reader: R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to read CSV row {}", index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let rows = read_rows(file).with_context(|| format!("Failed to load {:?}", path))?;
    debug!(path = %path.display(), rows = rows.len(), "csv loaded");

    Ok(rows)
}

/// `transaction_data.csv`
pub fn read_transactions(path: &Path) -> Result<Vec<RawTransactionRow>> {
    read_file(path)
}

/// `hh_demographic.csv`
pub fn read_demographics(path: &Path) -> Result<Vec<RawDemographicRow>> {
    read_file(path)
}

/// `campaign_desc.csv`
pub fn read_campaigns(path: &Path) -> Result<Vec<RawCampaignRow>> {
    read_file(path)
}

/// `coupon_redempt.csv`
pub fn read_redemptions(path: &Path) -> Result<Vec<RawRedemptionRow>> {
    read_file(path)
}

/// `product.csv`, reduced to a product id → commodity lookup
pub fn read_product_catalog(path: &Path) -> Result<ProductCatalog> {
    let rows: Vec<RawProductRow> = read_file(path)?;
    let catalog = ProductCatalog::from_rows(&rows)
        .with_context(|| format!("Invalid product catalog: {:?}", path))?;

    Ok(catalog)
}
