// 💾 Output Sink - Cleaned dataset, dimensions and audit artifacts on disk
// Column names follow the star-schema files downstream reporting expects
// (fact_transactions.csv, dim_household.csv, dim_calendar.csv, dim_campaign.csv,
// fact_redemptions.csv).

use crate::audit::AuditReport;
use crate::enrichment::{
    CampaignRow, DemographicProfile, EnrichedRecord, HouseholdRow, RedemptionRow,
};
use crate::pipeline::PipelineOutput;
use crate::temporal::CalendarDay;
use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const FACT_TRANSACTIONS: &str = "fact_transactions.csv";
pub const DIM_HOUSEHOLD: &str = "dim_household.csv";
pub const DIM_CALENDAR: &str = "dim_calendar.csv";
pub const DIM_CAMPAIGN: &str = "dim_campaign.csv";
pub const FACT_REDEMPTIONS: &str = "fact_redemptions.csv";
pub const AUDIT_JSON: &str = "audit_report.json";
pub const CHANGELOG: &str = "DATA_QUALITY_LOG.md";

// ============================================================================
// FLAT ROWS
// ============================================================================

/// The seven demographic columns, sentinel applied, in output order
fn demographic_columns(profile: &DemographicProfile, sentinel: &str) -> [String; 7] {
    profile.fields().map(|a| a.resolve(sentinel).to_string())
}

/// One line of `fact_transactions.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedRow {
    #[serde(rename = "household_key")]
    pub household_key: u32,
    #[serde(rename = "BASKET_ID")]
    pub basket_id: u64,
    #[serde(rename = "DAY")]
    pub day: u16,
    #[serde(rename = "PRODUCT_ID")]
    pub product_id: u64,
    #[serde(rename = "COMMODITY_DESC")]
    pub commodity_desc: String,
    #[serde(rename = "QUANTITY")]
    pub quantity: i32,
    #[serde(rename = "SALES_VALUE")]
    pub sales_value: f64,
    #[serde(rename = "STORE_ID")]
    pub store_id: Option<u32>,
    #[serde(rename = "RETAIL_DISC")]
    pub retail_disc: f64,
    #[serde(rename = "TRANS_TIME")]
    pub trans_time: Option<u16>,
    #[serde(rename = "WEEK_NO")]
    pub week_no: Option<u16>,
    #[serde(rename = "COUPON_DISC")]
    pub coupon_disc: f64,
    #[serde(rename = "COUPON_MATCH_DISC")]
    pub coupon_match_disc: f64,
    /// YYYY-MM-DD
    #[serde(rename = "DATE")]
    pub date: String,
    /// HH:MM:SS, empty when the row had no clock time
    #[serde(rename = "TIME")]
    pub time: String,
    #[serde(rename = "TOTAL_DISCOUNT_ABS")]
    pub total_discount_abs: f64,
    #[serde(rename = "HAS_DEMOGRAPHICS")]
    pub has_demographics: bool,
    #[serde(rename = "AGE_DESC")]
    pub age_desc: String,
    #[serde(rename = "MARITAL_STATUS_CODE")]
    pub marital_status_code: String,
    #[serde(rename = "INCOME_DESC")]
    pub income_desc: String,
    #[serde(rename = "HOMEOWNER_DESC")]
    pub homeowner_desc: String,
    #[serde(rename = "HH_COMP_DESC")]
    pub hh_comp_desc: String,
    #[serde(rename = "HOUSEHOLD_SIZE_DESC")]
    pub household_size_desc: String,
    #[serde(rename = "KID_CATEGORY_DESC")]
    pub kid_category_desc: String,
}

impl CleanedRow {
    pub fn new(record: &EnrichedRecord, sentinel: &str) -> Self {
        let t = &record.transaction;
        let [
            age_desc,
            marital_status_code,
            income_desc,
            homeowner_desc,
            hh_comp_desc,
            household_size_desc,
            kid_category_desc,
        ] = demographic_columns(&record.profile, sentinel);

        CleanedRow {
            household_key: t.household_key,
            basket_id: t.basket_id,
            day: t.day,
            product_id: t.product_id,
            commodity_desc: t.commodity_desc.clone(),
            quantity: t.quantity,
            sales_value: t.sales_value,
            store_id: t.store_id,
            retail_disc: t.retail_disc,
            trans_time: t.trans_time,
            week_no: t.week_no,
            coupon_disc: t.coupon_disc,
            coupon_match_disc: t.coupon_match_disc,
            date: record
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            time: record
                .time
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            total_discount_abs: record.total_discount_abs(),
            has_demographics: record.has_demographics,
            age_desc,
            marital_status_code,
            income_desc,
            homeowner_desc,
            hh_comp_desc,
            household_size_desc,
            kid_category_desc,
        }
    }
}

/// One line of `dim_household.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseholdDimRow {
    #[serde(rename = "household_key")]
    pub household_key: u32,
    #[serde(rename = "AGE_DESC")]
    pub age_desc: String,
    #[serde(rename = "MARITAL_STATUS_CODE")]
    pub marital_status_code: String,
    #[serde(rename = "INCOME_DESC")]
    pub income_desc: String,
    #[serde(rename = "HOMEOWNER_DESC")]
    pub homeowner_desc: String,
    #[serde(rename = "HH_COMP_DESC")]
    pub hh_comp_desc: String,
    #[serde(rename = "HOUSEHOLD_SIZE_DESC")]
    pub household_size_desc: String,
    #[serde(rename = "KID_CATEGORY_DESC")]
    pub kid_category_desc: String,
    #[serde(rename = "HAS_DEMOGRAPHICS")]
    pub has_demographics: bool,
    #[serde(rename = "TRANSACTION_COUNT")]
    pub transaction_count: usize,
}

impl HouseholdDimRow {
    pub fn new(row: &HouseholdRow, sentinel: &str) -> Self {
        let [
            age_desc,
            marital_status_code,
            income_desc,
            homeowner_desc,
            hh_comp_desc,
            household_size_desc,
            kid_category_desc,
        ] = demographic_columns(&row.profile, sentinel);

        HouseholdDimRow {
            household_key: row.household_key,
            age_desc,
            marital_status_code,
            income_desc,
            homeowner_desc,
            hh_comp_desc,
            household_size_desc,
            kid_category_desc,
            has_demographics: row.has_demographics,
            transaction_count: row.transaction_count,
        }
    }
}

/// One line of `dim_calendar.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDimRow<'a> {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "DAY")]
    pub day: u16,
    #[serde(rename = "Day_of_Week")]
    pub day_of_week: u32,
    #[serde(rename = "Day_Name")]
    pub day_name: &'a str,
    #[serde(rename = "Day_of_Month")]
    pub day_of_month: u32,
    #[serde(rename = "Week_of_Year")]
    pub week_of_year: u32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Month_Name")]
    pub month_name: &'a str,
    #[serde(rename = "Month_Short")]
    pub month_short: &'a str,
    #[serde(rename = "Quarter")]
    pub quarter: u32,
    #[serde(rename = "Quarter_Name")]
    pub quarter_name: &'a str,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Year_Month")]
    pub year_month: &'a str,
    #[serde(rename = "Is_Weekend")]
    pub is_weekend: bool,
}

impl<'a> From<&'a CalendarDay> for CalendarDimRow<'a> {
    fn from(day: &'a CalendarDay) -> Self {
        CalendarDimRow {
            date: day.date.format("%Y-%m-%d").to_string(),
            day: day.day,
            day_of_week: day.day_of_week,
            day_name: &day.day_name,
            day_of_month: day.day_of_month,
            week_of_year: day.week_of_year,
            month: day.month,
            month_name: &day.month_name,
            month_short: &day.month_short,
            quarter: day.quarter,
            quarter_name: &day.quarter_name,
            year: day.year,
            year_month: &day.year_month,
            is_weekend: day.is_weekend,
        }
    }
}

/// One line of `dim_campaign.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignDimRow<'a> {
    #[serde(rename = "DESCRIPTION")]
    pub description: &'a str,
    #[serde(rename = "CAMPAIGN")]
    pub campaign: u32,
    #[serde(rename = "START_DAY")]
    pub start_day: u16,
    #[serde(rename = "END_DAY")]
    pub end_day: u16,
    /// Empty for unrecognised type codes
    #[serde(rename = "CAMPAIGN_TYPE_LABEL")]
    pub type_label: Option<&'a str>,
    #[serde(rename = "START_DATE")]
    pub start_date: String,
    #[serde(rename = "END_DATE")]
    pub end_date: String,
    #[serde(rename = "DURATION_DAYS")]
    pub duration_days: u16,
}

impl<'a> From<&'a CampaignRow> for CampaignDimRow<'a> {
    fn from(row: &'a CampaignRow) -> Self {
        CampaignDimRow {
            description: &row.campaign.description,
            campaign: row.campaign.campaign,
            start_day: row.campaign.start_day,
            end_day: row.campaign.end_day,
            type_label: row.type_label.as_deref(),
            start_date: row.start_date.format("%Y-%m-%d").to_string(),
            end_date: row.end_date.format("%Y-%m-%d").to_string(),
            duration_days: row.duration_days,
        }
    }
}

/// One line of `fact_redemptions.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedemptionFactRow {
    #[serde(rename = "household_key")]
    pub household_key: u32,
    #[serde(rename = "DAY")]
    pub day: u16,
    #[serde(rename = "COUPON_UPC")]
    pub coupon_upc: u64,
    #[serde(rename = "CAMPAIGN")]
    pub campaign: u32,
    #[serde(rename = "DATE")]
    pub date: String,
}

impl From<&RedemptionRow> for RedemptionFactRow {
    fn from(row: &RedemptionRow) -> Self {
        let r = &row.redemption;
        RedemptionFactRow {
            household_key: r.household_key,
            day: r.day,
            coupon_upc: r.coupon_upc,
            campaign: r.campaign,
            date: row.date.format("%Y-%m-%d").to_string(),
        }
    }
}

// ============================================================================
// WRITERS
// ============================================================================

fn write_csv<T, W>(writer: W, rows: impl IntoIterator<Item = T>) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to serialize CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

fn create(path: &Path) -> Result<fs::File> {
    fs::File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))
}

/// Cleaned dataset as `fact_transactions.csv`
pub fn write_dataset<W: Write>(
    writer: W,
    dataset: &[EnrichedRecord],
    sentinel: &str,
) -> Result<()> {
    write_csv(writer, dataset.iter().map(|r| CleanedRow::new(r, sentinel)))
}

pub fn write_households<W: Write>(
    writer: W,
    households: &[HouseholdRow],
    sentinel: &str,
) -> Result<()> {
    write_csv(writer, households.iter().map(|h| HouseholdDimRow::new(h, sentinel)))
}

pub fn write_calendar<W: Write>(writer: W, calendar: &[CalendarDay]) -> Result<()> {
    write_csv(writer, calendar.iter().map(CalendarDimRow::from))
}

pub fn write_campaigns<W: Write>(writer: W, campaigns: &[CampaignRow]) -> Result<()> {
    write_csv(writer, campaigns.iter().map(CampaignDimRow::from))
}

pub fn write_redemptions<W: Write>(writer: W, redemptions: &[RedemptionRow]) -> Result<()> {
    write_csv(writer, redemptions.iter().map(RedemptionFactRow::from))
}

/// Audit report as pretty JSON
pub fn write_audit_json<W: Write>(writer: W, audit: &AuditReport) -> Result<()> {
    serde_json::to_writer_pretty(writer, audit).context("Failed to serialize audit report")?;
    Ok(())
}

/// Audit report as the Markdown data quality log
pub fn write_changelog<W: Write>(mut writer: W, audit: &AuditReport) -> Result<()> {
    writer
        .write_all(audit.to_changelog().as_bytes())
        .context("Failed to write data quality log")?;
    Ok(())
}

/// Write every artifact of a run into `dir`, creating it if needed.
/// The promotion files are only written when the run loaded promotions.
pub fn write_all(dir: &Path, output: &PipelineOutput, sentinel: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let mut paths = Vec::new();
    let mut next = |name: &str| -> Result<fs::File> {
        let path = dir.join(name);
        let file = create(&path)?;
        paths.push(path);
        Ok(file)
    };

    write_dataset(next(FACT_TRANSACTIONS)?, &output.dataset, sentinel)?;
    write_households(next(DIM_HOUSEHOLD)?, &output.households, sentinel)?;
    write_calendar(next(DIM_CALENDAR)?, &output.calendar)?;
    if !output.campaigns.is_empty() {
        write_campaigns(next(DIM_CAMPAIGN)?, &output.campaigns)?;
    }
    if !output.redemptions.is_empty() {
        write_redemptions(next(FACT_REDEMPTIONS)?, &output.redemptions)?;
    }
    write_audit_json(next(AUDIT_JSON)?, &output.audit)?;
    write_changelog(next(CHANGELOG)?, &output.audit)?;

    info!(dir = %dir.display(), rows = output.dataset.len(), "outputs written");

    Ok(paths)
}
