// 🧾 Record Model - Typed transaction lines and household demographics
// Raw rows arrive as strings from the ingestion collaborator; parse() is the
// only place a row can be rejected for being malformed.

use crate::error::{ParseError, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// RAW ROWS (as read from CSV, nothing coerced yet)
// ============================================================================

/// RawTransactionRow - one line of `transaction_data.csv`
///
/// Every column is optional at this layer so that a missing column surfaces
/// as a `ParseError` naming the field rather than as a reader failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionRow {
    #[serde(rename = "household_key", default)]
    pub household_key: Option<String>,

    #[serde(rename = "BASKET_ID", default)]
    pub basket_id: Option<String>,

    #[serde(rename = "DAY", default)]
    pub day: Option<String>,

    #[serde(rename = "PRODUCT_ID", default)]
    pub product_id: Option<String>,

    #[serde(rename = "QUANTITY", default)]
    pub quantity: Option<String>,

    #[serde(rename = "SALES_VALUE", default)]
    pub sales_value: Option<String>,

    #[serde(rename = "STORE_ID", default)]
    pub store_id: Option<String>,

    #[serde(rename = "RETAIL_DISC", default)]
    pub retail_disc: Option<String>,

    #[serde(rename = "TRANS_TIME", default)]
    pub trans_time: Option<String>,

    #[serde(rename = "WEEK_NO", default)]
    pub week_no: Option<String>,

    #[serde(rename = "COUPON_DISC", default)]
    pub coupon_disc: Option<String>,

    #[serde(rename = "COUPON_MATCH_DISC", default)]
    pub coupon_match_disc: Option<String>,

    /// Usually absent from transaction exports; filled from the product catalog
    #[serde(rename = "COMMODITY_DESC", default)]
    pub commodity_desc: Option<String>,
}

/// RawDemographicRow - one line of `hh_demographic.csv`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDemographicRow {
    #[serde(rename = "household_key", default)]
    pub household_key: Option<String>,

    #[serde(rename = "AGE_DESC", default)]
    pub age_desc: Option<String>,

    #[serde(rename = "MARITAL_STATUS_CODE", default)]
    pub marital_status_code: Option<String>,

    #[serde(rename = "INCOME_DESC", default)]
    pub income_desc: Option<String>,

    #[serde(rename = "HOMEOWNER_DESC", default)]
    pub homeowner_desc: Option<String>,

    #[serde(rename = "HH_COMP_DESC", default)]
    pub hh_comp_desc: Option<String>,

    #[serde(rename = "HOUSEHOLD_SIZE_DESC", default)]
    pub household_size_desc: Option<String>,

    #[serde(rename = "KID_CATEGORY_DESC", default)]
    pub kid_category_desc: Option<String>,
}

/// RawProductRow - the two columns of `product.csv` the pipeline needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProductRow {
    #[serde(rename = "PRODUCT_ID", default)]
    pub product_id: Option<String>,

    #[serde(rename = "COMMODITY_DESC", default)]
    pub commodity_desc: Option<String>,
}

/// RawCampaignRow - one line of `campaign_desc.csv`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCampaignRow {
    #[serde(rename = "DESCRIPTION", default)]
    pub description: Option<String>,

    #[serde(rename = "CAMPAIGN", default)]
    pub campaign: Option<String>,

    #[serde(rename = "START_DAY", default)]
    pub start_day: Option<String>,

    #[serde(rename = "END_DAY", default)]
    pub end_day: Option<String>,
}

/// RawRedemptionRow - one line of `coupon_redempt.csv`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRedemptionRow {
    #[serde(rename = "household_key", default)]
    pub household_key: Option<String>,

    #[serde(rename = "DAY", default)]
    pub day: Option<String>,

    #[serde(rename = "COUPON_UPC", default)]
    pub coupon_upc: Option<String>,

    #[serde(rename = "CAMPAIGN", default)]
    pub campaign: Option<String>,
}

// ============================================================================
// TYPED RECORDS
// ============================================================================

/// Audit key of an input row
///
/// Household and product are optional so rows rejected at parse time can
/// still be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub row: usize,
    pub household_key: Option<u32>,
    pub product_id: Option<u64>,
}

impl RecordKey {
    /// Best-effort key for a raw transaction row that failed to parse
    pub fn from_raw(raw: &RawTransactionRow, row: usize) -> Self {
        RecordKey {
            row,
            household_key: present(&raw.household_key).and_then(|v| v.parse().ok()),
            product_id: present(&raw.product_id).and_then(|v| v.parse().ok()),
        }
    }

    pub fn from_raw_demographic(raw: &RawDemographicRow, row: usize) -> Self {
        RecordKey {
            row,
            household_key: present(&raw.household_key).and_then(|v| v.parse().ok()),
            product_id: None,
        }
    }

    pub fn from_raw_redemption(raw: &RawRedemptionRow, row: usize) -> Self {
        RecordKey {
            row,
            household_key: present(&raw.household_key).and_then(|v| v.parse().ok()),
            product_id: None,
        }
    }

    /// Key for rows that carry neither household nor product
    pub fn at(row: usize) -> Self {
        RecordKey {
            row,
            household_key: None,
            product_id: None,
        }
    }
}

/// TransactionRecord - one point-of-sale line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// 1-based position in the raw input
    pub row: usize,
    pub household_key: u32,
    pub basket_id: u64,
    pub product_id: u64,
    pub commodity_desc: String,
    /// Negative for returns
    pub quantity: i32,
    pub sales_value: f64,
    /// Expected <= 0
    pub retail_disc: f64,
    /// Expected <= 0
    pub coupon_disc: f64,
    pub coupon_match_disc: f64,
    /// 1-based relative day
    pub day: u16,
    pub store_id: Option<u32>,
    pub week_no: Option<u16>,
    /// Clock time as HHMM (e.g. 1631)
    pub trans_time: Option<u16>,
}

impl TransactionRecord {
    /// Parse a raw row, consulting `catalog` when the row carries no commodity
    pub fn parse(
        raw: &RawTransactionRow,
        row: usize,
        catalog: &ProductCatalog,
    ) -> Result<Self, ParseError> {
        let t = Table::Transactions;

        let product_id: u64 = parse_number(t, row, "PRODUCT_ID", &raw.product_id)?;

        let commodity_desc = match present(&raw.commodity_desc) {
            Some(desc) => desc.to_string(),
            None => catalog
                .commodity(product_id)
                .map(str::to_string)
                .ok_or_else(|| {
                    ParseError::new(
                        t,
                        row,
                        "COMMODITY_DESC",
                        format!("is missing and product {} is not in the catalog", product_id),
                    )
                })?,
        };

        let day: u16 = parse_number(t, row, "DAY", &raw.day)?;
        if day == 0 {
            return Err(ParseError::new(t, row, "DAY", "must be a positive day-index"));
        }

        let trans_time = match present(&raw.trans_time) {
            Some(value) => Some(parse_clock(t, row, value)?),
            None => None,
        };

        Ok(TransactionRecord {
            row,
            household_key: parse_number(t, row, "household_key", &raw.household_key)?,
            basket_id: parse_number(t, row, "BASKET_ID", &raw.basket_id)?,
            product_id,
            commodity_desc,
            quantity: parse_number(t, row, "QUANTITY", &raw.quantity)?,
            sales_value: parse_money(t, row, "SALES_VALUE", &raw.sales_value)?,
            retail_disc: parse_money(t, row, "RETAIL_DISC", &raw.retail_disc)?,
            coupon_disc: parse_money(t, row, "COUPON_DISC", &raw.coupon_disc)?,
            coupon_match_disc: parse_optional_money(
                t,
                row,
                "COUPON_MATCH_DISC",
                &raw.coupon_match_disc,
            )?,
            day,
            store_id: parse_optional_number(t, row, "STORE_ID", &raw.store_id)?,
            week_no: parse_optional_number(t, row, "WEEK_NO", &raw.week_no)?,
            trans_time,
        })
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            row: self.row,
            household_key: Some(self.household_key),
            product_id: Some(self.product_id),
        }
    }

    /// Sales value per unit; None unless quantity is positive
    pub fn unit_price(&self) -> Option<f64> {
        if self.quantity > 0 {
            Some(self.sales_value / f64::from(self.quantity))
        } else {
            None
        }
    }

    pub fn is_return(&self) -> bool {
        self.quantity < 0
    }

    /// Absolute value of retail plus coupon discount
    pub fn total_discount_abs(&self) -> f64 {
        (self.retail_disc + self.coupon_disc).abs()
    }
}

/// HouseholdDemographic - one household's (partially known) profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdDemographic {
    pub household_key: u32,
    pub age_desc: Option<String>,
    pub marital_status_code: Option<String>,
    pub income_desc: Option<String>,
    pub homeowner_desc: Option<String>,
    pub hh_comp_desc: Option<String>,
    pub household_size_desc: Option<String>,
    pub kid_category_desc: Option<String>,
}

impl HouseholdDemographic {
    pub fn parse(raw: &RawDemographicRow, row: usize) -> Result<Self, ParseError> {
        Ok(HouseholdDemographic {
            household_key: parse_number(
                Table::Demographics,
                row,
                "household_key",
                &raw.household_key,
            )?,
            age_desc: present(&raw.age_desc).map(str::to_string),
            marital_status_code: present(&raw.marital_status_code).map(str::to_string),
            income_desc: present(&raw.income_desc).map(str::to_string),
            homeowner_desc: present(&raw.homeowner_desc).map(str::to_string),
            hh_comp_desc: present(&raw.hh_comp_desc).map(str::to_string),
            household_size_desc: present(&raw.household_size_desc).map(str::to_string),
            kid_category_desc: present(&raw.kid_category_desc).map(str::to_string),
        })
    }
}

/// Campaign - one marketing campaign and the day-indices it ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub row: usize,
    pub campaign: u32,
    /// Campaign type code, e.g. "TypeA"
    pub description: String,
    pub start_day: u16,
    pub end_day: u16,
}

impl Campaign {
    pub fn parse(raw: &RawCampaignRow, row: usize) -> Result<Self, ParseError> {
        let t = Table::Campaigns;

        let description = present(&raw.description)
            .ok_or_else(|| ParseError::missing(t, row, "DESCRIPTION"))?
            .to_string();
        let start_day: u16 = parse_number(t, row, "START_DAY", &raw.start_day)?;
        let end_day: u16 = parse_number(t, row, "END_DAY", &raw.end_day)?;

        if start_day == 0 {
            return Err(ParseError::new(t, row, "START_DAY", "must be a positive day-index"));
        }
        if end_day < start_day {
            return Err(ParseError::new(
                t,
                row,
                "END_DAY",
                format!("{} precedes START_DAY {}", end_day, start_day),
            ));
        }

        Ok(Campaign {
            row,
            campaign: parse_number(t, row, "CAMPAIGN", &raw.campaign)?,
            description,
            start_day,
            end_day,
        })
    }
}

/// CouponRedemption - a household redeeming a campaign coupon on a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub row: usize,
    pub household_key: u32,
    pub day: u16,
    pub coupon_upc: u64,
    pub campaign: u32,
}

impl CouponRedemption {
    pub fn parse(raw: &RawRedemptionRow, row: usize) -> Result<Self, ParseError> {
        let t = Table::Redemptions;

        let day: u16 = parse_number(t, row, "DAY", &raw.day)?;
        if day == 0 {
            return Err(ParseError::new(t, row, "DAY", "must be a positive day-index"));
        }

        Ok(CouponRedemption {
            row,
            household_key: parse_number(t, row, "household_key", &raw.household_key)?,
            day,
            coupon_upc: parse_number(t, row, "COUPON_UPC", &raw.coupon_upc)?,
            campaign: parse_number(t, row, "CAMPAIGN", &raw.campaign)?,
        })
    }
}

// ============================================================================
// PRODUCT CATALOG
// ============================================================================

/// Product id → commodity description lookup
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    commodities: HashMap<u64, String>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        ProductCatalog::default()
    }

    /// Build from raw product rows; the first description seen for an id wins
    pub fn from_rows(rows: &[RawProductRow]) -> Result<Self, ParseError> {
        let mut catalog = ProductCatalog::new();

        for (index, raw) in rows.iter().enumerate() {
            let row = index + 1;
            let product_id: u64 =
                parse_number(Table::Products, row, "PRODUCT_ID", &raw.product_id)?;
            let desc = present(&raw.commodity_desc)
                .ok_or_else(|| ParseError::missing(Table::Products, row, "COMMODITY_DESC"))?;

            catalog
                .commodities
                .entry(product_id)
                .or_insert_with(|| desc.to_string());
        }

        Ok(catalog)
    }

    pub fn insert(&mut self, product_id: u64, commodity_desc: impl Into<String>) {
        self.commodities.insert(product_id, commodity_desc.into());
    }

    pub fn commodity(&self, product_id: u64) -> Option<&str> {
        self.commodities.get(&product_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commodities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commodities.is_empty()
    }
}

// ============================================================================
// FIELD COERCION
// ============================================================================

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    table: Table,
    row: usize,
    field: &str,
    value: &Option<String>,
) -> Result<T, ParseError> {
    let text = present(value).ok_or_else(|| ParseError::missing(table, row, field))?;
    text.parse::<T>().map_err(|_| {
        // an integer the field's type cannot hold, e.g. DAY = -1
        let reason = if text.parse::<i128>().is_ok() {
            format!("is outside the accepted range: {:?}", text)
        } else {
            format!("is not an integer: {:?}", text)
        };
        ParseError::new(table, row, field, reason)
    })
}

fn parse_optional_number<T: FromStr>(
    table: Table,
    row: usize,
    field: &str,
    value: &Option<String>,
) -> Result<Option<T>, ParseError> {
    match present(value) {
        Some(_) => parse_number(table, row, field, value).map(Some),
        None => Ok(None),
    }
}

fn parse_money(
    table: Table,
    row: usize,
    field: &str,
    value: &Option<String>,
) -> Result<f64, ParseError> {
    let text = present(value).ok_or_else(|| ParseError::missing(table, row, field))?;
    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(ParseError::new(
            table,
            row,
            field,
            format!("is not a decimal amount: {:?}", text),
        )),
    }
}

fn parse_optional_money(
    table: Table,
    row: usize,
    field: &str,
    value: &Option<String>,
) -> Result<f64, ParseError> {
    match present(value) {
        Some(_) => parse_money(table, row, field, value),
        None => Ok(0.0),
    }
}

/// HHMM clock value, e.g. "0907" or "1631"
fn parse_clock(table: Table, row: usize, text: &str) -> Result<u16, ParseError> {
    let invalid = || {
        ParseError::new(table, row, "TRANS_TIME", format!("is not an HHMM time: {:?}", text))
    };

    let value: u16 = text.parse().map_err(|_| invalid())?;
    if value / 100 > 23 || value % 100 > 59 {
        return Err(invalid());
    }
    Ok(value)
}

// ============================================================================
// TESTS
// ============================================================================
