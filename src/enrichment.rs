// 🔗 Enrichment Stage - Demographic left join and date anchoring
// Every cleaned transaction comes out exactly once, in input order, whether or
// not its household has a demographic row ("shadow customers").

use crate::records::{Campaign, CouponRedemption, HouseholdDemographic, TransactionRecord};
use crate::temporal::{clock_time, DateAnchor};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

// ============================================================================
// ATTRIBUTE
// ============================================================================

/// A demographic field after the join
///
/// `Unknown` covers both "household has no demographic row" and "row has no
/// value for this field"; the sentinel text is only applied on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Known(String),
    Unknown,
}

impl Attribute {
    pub fn from_option(value: Option<&String>) -> Self {
        match value {
            Some(v) => Attribute::Known(v.clone()),
            None => Attribute::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Attribute::Known(_))
    }

    /// The value, or `sentinel` when unknown
    pub fn resolve<'a>(&'a self, sentinel: &'a str) -> &'a str {
        match self {
            Attribute::Known(v) => v,
            Attribute::Unknown => sentinel,
        }
    }
}

// ============================================================================
// DEMOGRAPHIC PROFILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicProfile {
    pub age: Attribute,
    pub marital_status: Attribute,
    pub income: Attribute,
    pub homeowner: Attribute,
    pub household_composition: Attribute,
    pub household_size: Attribute,
    pub kid_category: Attribute,
}

impl DemographicProfile {
    /// Profile of a household with no demographic row
    pub fn unknown() -> Self {
        DemographicProfile {
            age: Attribute::Unknown,
            marital_status: Attribute::Unknown,
            income: Attribute::Unknown,
            homeowner: Attribute::Unknown,
            household_composition: Attribute::Unknown,
            household_size: Attribute::Unknown,
            kid_category: Attribute::Unknown,
        }
    }

    pub fn from_demographic(demo: &HouseholdDemographic) -> Self {
        DemographicProfile {
            age: Attribute::from_option(demo.age_desc.as_ref()),
            marital_status: Attribute::from_option(demo.marital_status_code.as_ref()),
            income: Attribute::from_option(demo.income_desc.as_ref()),
            homeowner: Attribute::from_option(demo.homeowner_desc.as_ref()),
            household_composition: Attribute::from_option(demo.hh_comp_desc.as_ref()),
            household_size: Attribute::from_option(demo.household_size_desc.as_ref()),
            kid_category: Attribute::from_option(demo.kid_category_desc.as_ref()),
        }
    }

    /// Fields in output column order
    pub fn fields(&self) -> [&Attribute; 7] {
        [
            &self.age,
            &self.marital_status,
            &self.income,
            &self.homeowner,
            &self.household_composition,
            &self.household_size,
            &self.kid_category,
        ]
    }
}

// ============================================================================
// DEMOGRAPHIC INDEX
// ============================================================================

/// Household key → demographic row
#[derive(Debug, Clone, Default)]
pub struct DemographicIndex {
    households: HashMap<u32, HouseholdDemographic>,
}

impl DemographicIndex {
    pub fn new() -> Self {
        DemographicIndex::default()
    }

    /// Insert a household; hands back the rejected row if the key is taken
    pub fn insert(&mut self, demo: HouseholdDemographic) -> Result<(), HouseholdDemographic> {
        if self.households.contains_key(&demo.household_key) {
            return Err(demo);
        }
        self.households.insert(demo.household_key, demo);
        Ok(())
    }

    pub fn get(&self, household_key: u32) -> Option<&HouseholdDemographic> {
        self.households.get(&household_key)
    }

    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }
}

// ============================================================================
// ENRICHED RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub transaction: TransactionRecord,
    pub profile: DemographicProfile,
    /// False for shadow customers
    pub has_demographics: bool,
    /// Absolute date, filled by `anchor_dates`
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl EnrichedRecord {
    pub fn total_discount_abs(&self) -> f64 {
        self.transaction.total_discount_abs()
    }
}

/// Left join of transactions onto demographics; total and order preserving
pub fn join(
    transactions: Vec<TransactionRecord>,
    demographics: &DemographicIndex,
) -> Vec<EnrichedRecord> {
    let mut shadow = 0usize;

    let enriched: Vec<EnrichedRecord> = transactions
        .into_iter()
        .map(|transaction| {
            let (profile, has_demographics) = match demographics.get(transaction.household_key) {
                Some(demo) => (DemographicProfile::from_demographic(demo), true),
                None => {
                    shadow += 1;
                    (DemographicProfile::unknown(), false)
                }
            };
            let time = transaction.trans_time.and_then(clock_time);

            EnrichedRecord {
                transaction,
                profile,
                has_demographics,
                date: None,
                time,
            }
        })
        .collect();

    info!(
        records = enriched.len(),
        without_demographics = shadow,
        "demographic join complete"
    );

    enriched
}

/// Convert every record's day-index to an absolute date
pub fn anchor_dates(mut records: Vec<EnrichedRecord>, anchor: &DateAnchor) -> Vec<EnrichedRecord> {
    for record in records.iter_mut() {
        record.date = Some(anchor.date_for(record.transaction.day));
    }
    records
}

// ============================================================================
// HOUSEHOLD DIMENSION
// ============================================================================

/// One row per household that appears in the input transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdRow {
    pub household_key: u32,
    pub profile: DemographicProfile,
    pub has_demographics: bool,
    /// Rows of this household in the cleaned dataset; zero when all were filtered
    pub transaction_count: usize,
}

/// Left join of every input household onto demographics, ordered by key
///
/// `households` are the keys seen before the rule pass, so a household whose
/// lines were all excluded still gets a row.
pub fn household_dimension(
    households: &BTreeSet<u32>,
    demographics: &DemographicIndex,
    dataset: &[EnrichedRecord],
) -> Vec<HouseholdRow> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for record in dataset {
        *counts.entry(record.transaction.household_key).or_insert(0) += 1;
    }

    households
        .iter()
        .map(|&household_key| {
            let (profile, has_demographics) = match demographics.get(household_key) {
                Some(demo) => (DemographicProfile::from_demographic(demo), true),
                None => (DemographicProfile::unknown(), false),
            };

            HouseholdRow {
                household_key,
                profile,
                has_demographics,
                transaction_count: counts.get(&household_key).copied().unwrap_or(0),
            }
        })
        .collect()
}

// ============================================================================
// PROMOTIONS
// ============================================================================

/// Friendly label for a campaign type code
pub fn campaign_type_label(description: &str) -> Option<&'static str> {
    match description.trim() {
        "TypeA" => Some("Personalized"),
        "TypeB" => Some("Targeted"),
        "TypeC" => Some("Mass"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRow {
    pub campaign: Campaign,
    /// None for unrecognised type codes
    pub type_label: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// END_DAY - START_DAY
    pub duration_days: u16,
}

/// Campaigns with anchored start/end dates, in input order
pub fn campaign_dimension(campaigns: Vec<Campaign>, anchor: &DateAnchor) -> Vec<CampaignRow> {
    campaigns
        .into_iter()
        .map(|campaign| CampaignRow {
            type_label: campaign_type_label(&campaign.description).map(str::to_string),
            start_date: anchor.date_for(campaign.start_day),
            end_date: anchor.date_for(campaign.end_day),
            // parse guarantees end_day >= start_day
            duration_days: campaign.end_day - campaign.start_day,
            campaign,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRow {
    pub redemption: CouponRedemption,
    pub date: NaiveDate,
}

/// Coupon redemptions with anchored dates, in input order
pub fn redemption_facts(
    redemptions: Vec<CouponRedemption>,
    anchor: &DateAnchor,
) -> Vec<RedemptionRow> {
    redemptions
        .into_iter()
        .map(|redemption| RedemptionRow {
            date: anchor.date_for(redemption.day),
            redemption,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
