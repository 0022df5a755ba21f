// 🚚 Pipeline Orchestrator - parse → rules → join → anchor → output
// One call, one run: the orchestrator owns every record until it hands back
// the cleaned dataset and its audit report.

use crate::audit::{AuditKind, AuditRecorder, AuditReport};
use crate::config::{CleaningConfig, ParseErrorPolicy};
use crate::enrichment::{
    anchor_dates, campaign_dimension, household_dimension, join, redemption_facts, CampaignRow,
    DemographicIndex, EnrichedRecord, HouseholdRow, RedemptionRow,
};
use crate::error::{ParseError, Result, Table};
use crate::records::{
    Campaign, CouponRedemption, HouseholdDemographic, ProductCatalog, RawCampaignRow,
    RawDemographicRow, RawRedemptionRow, RawTransactionRow, RecordKey, TransactionRecord,
};
use crate::rules::{RuleEngine, RuleSet};
use crate::temporal::{calendar_dimension, CalendarDay};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Audit entry for transaction rows dropped at the parse boundary
pub const PARSE_REJECTED: &str = "parse_rejected";

/// Audit entry for demographic rows dropped at the parse boundary
pub const DEMOGRAPHICS_REJECTED: &str = "demographics_rejected";

pub const CAMPAIGNS_REJECTED: &str = "campaigns_rejected";

pub const REDEMPTIONS_REJECTED: &str = "redemptions_rejected";

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Cleaned, enriched transactions in input order
    pub dataset: Vec<EnrichedRecord>,
    pub audit: AuditReport,
    /// Every household in the parsed transactions, filtered or not
    pub households: Vec<HouseholdRow>,
    /// Date dimension spanning the parsed input's day range
    pub calendar: Vec<CalendarDay>,
    pub campaigns: Vec<CampaignRow>,
    pub redemptions: Vec<RedemptionRow>,
    pub input_rows: usize,
}

#[derive(Serialize)]
struct FingerprintView<'a> {
    dataset: &'a [EnrichedRecord],
    audit: &'a AuditReport,
}

impl PipelineOutput {
    /// Every input row is either in the dataset or counted exactly once
    pub fn is_consistent(&self) -> bool {
        self.input_rows == self.dataset.len() + self.audit.filtered_total()
    }

    /// Households with no demographic row
    pub fn shadow_households(&self) -> usize {
        self.households.iter().filter(|h| !h.has_demographics).count()
    }

    /// SHA-256 over the serialized dataset and audit report
    ///
    /// Two runs over the same input and configuration produce the same value.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let bytes = serde_json::to_vec(&FingerprintView {
            dataset: &self.dataset,
            audit: &self.audit,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Campaign and coupon redemption rows; both optional
#[derive(Debug, Clone, Copy, Default)]
pub struct PromotionRows<'a> {
    pub campaigns: &'a [RawCampaignRow],
    pub redemptions: &'a [RawRedemptionRow],
}

/// Pipeline - configuration, rule set and reference tables for repeated runs
pub struct Pipeline {
    config: CleaningConfig,
    rules: RuleSet,
    catalog: ProductCatalog,
    campaigns: Vec<RawCampaignRow>,
    redemptions: Vec<RawRedemptionRow>,
}

impl Pipeline {
    /// Validates the configuration and builds the rules it names
    pub fn new(config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        let rules = RuleSet::from_config(&config);

        Ok(Pipeline {
            config,
            rules,
            catalog: ProductCatalog::new(),
            campaigns: Vec::new(),
            redemptions: Vec::new(),
        })
    }

    /// Product catalog used to fill missing commodity descriptions
    pub fn with_catalog(mut self, catalog: ProductCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_campaigns(mut self, campaigns: Vec<RawCampaignRow>) -> Self {
        self.campaigns = campaigns;
        self
    }

    pub fn with_redemptions(mut self, redemptions: Vec<RawRedemptionRow>) -> Self {
        self.redemptions = redemptions;
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn run(
        &self,
        raw_transactions: &[RawTransactionRow],
        raw_demographics: &[RawDemographicRow],
    ) -> Result<PipelineOutput> {
        let promotions = PromotionRows {
            campaigns: &self.campaigns,
            redemptions: &self.redemptions,
        };

        run_with_promotions(
            raw_transactions,
            raw_demographics,
            promotions,
            &self.catalog,
            &self.rules,
            &self.config,
        )
    }
}

/// Run one full cleaning pass without promotion tables
pub fn run(
    raw_transactions: &[RawTransactionRow],
    raw_demographics: &[RawDemographicRow],
    catalog: &ProductCatalog,
    rules: &RuleSet,
    config: &CleaningConfig,
) -> Result<PipelineOutput> {
    run_with_promotions(
        raw_transactions,
        raw_demographics,
        PromotionRows::default(),
        catalog,
        rules,
        config,
    )
}

/// Run one full cleaning pass
///
/// Fails before touching any row if the configuration is invalid, and on the
/// first malformed row unless `parse_error_policy` is `skip`.
pub fn run_with_promotions(
    raw_transactions: &[RawTransactionRow],
    raw_demographics: &[RawDemographicRow],
    promotions: PromotionRows<'_>,
    catalog: &ProductCatalog,
    rules: &RuleSet,
    config: &CleaningConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let anchor = config.date_anchor()?;

    let mut recorder = AuditRecorder::new(config.audit_sample_size);
    if config.parse_error_policy == ParseErrorPolicy::Skip {
        register_rejections(&mut recorder);
    }

    // 1. Parse
    let transactions = parse_rows(
        raw_transactions,
        PARSE_REJECTED,
        config,
        &mut recorder,
        |raw, row| TransactionRecord::parse(raw, row, catalog),
        RecordKey::from_raw,
    )?;
    let demographics = parse_demographics(raw_demographics, config, &mut recorder)?;
    let campaigns = parse_rows(
        promotions.campaigns,
        CAMPAIGNS_REJECTED,
        config,
        &mut recorder,
        Campaign::parse,
        |_, row| RecordKey::at(row),
    )?;
    let redemptions = parse_rows(
        promotions.redemptions,
        REDEMPTIONS_REJECTED,
        config,
        &mut recorder,
        CouponRedemption::parse,
        RecordKey::from_raw_redemption,
    )?;
    info!(
        transactions = transactions.len(),
        households = demographics.len(),
        campaigns = campaigns.len(),
        redemptions = redemptions.len(),
        "input parsed"
    );

    let day_range = transactions
        .iter()
        .map(|t| t.day)
        .fold(None, |range: Option<(u16, u16)>, day| match range {
            Some((lo, hi)) => Some((lo.min(day), hi.max(day))),
            None => Some((day, day)),
        });
    let household_keys: BTreeSet<u32> = transactions.iter().map(|t| t.household_key).collect();

    // 2. Rules
    let engine = RuleEngine::new(rules, config.audit_sample_size, config.chunk_size);
    let survivors = engine.apply_into(transactions, &mut recorder);

    // 3. Enrichment
    let dataset = anchor_dates(join(survivors, &demographics), &anchor);
    let households = household_dimension(&household_keys, &demographics, &dataset);
    let calendar = match day_range {
        Some((first, last)) => calendar_dimension(first, last, &anchor),
        None => Vec::new(),
    };

    let output = PipelineOutput {
        dataset,
        audit: recorder.report(),
        households,
        calendar,
        campaigns: campaign_dimension(campaigns, &anchor),
        redemptions: redemption_facts(redemptions, &anchor),
        input_rows: raw_transactions.len(),
    };

    info!(
        input = output.input_rows,
        cleaned = output.dataset.len(),
        removed = output.audit.filtered_total(),
        households = output.households.len(),
        shadow_households = output.shadow_households(),
        "pipeline run complete"
    );

    Ok(output)
}

fn register_rejections(recorder: &mut AuditRecorder) {
    let entries = [
        (PARSE_REJECTED, "Malformed transaction rows", Table::Transactions),
        (DEMOGRAPHICS_REJECTED, "Malformed or duplicate demographic rows", Table::Demographics),
        (CAMPAIGNS_REJECTED, "Malformed campaign rows", Table::Campaigns),
        (REDEMPTIONS_REJECTED, "Malformed coupon redemption rows", Table::Redemptions),
    ];

    for (id, description, table) in entries {
        recorder.register(id, description, AuditKind::Parse, table);
    }
}

fn parse_rows<R, T>(
    raw: &[R],
    entry: &str,
    config: &CleaningConfig,
    recorder: &mut AuditRecorder,
    parse: impl Fn(&R, usize) -> std::result::Result<T, ParseError>,
    key: impl Fn(&R, usize) -> RecordKey,
) -> Result<Vec<T>> {
    let mut parsed = Vec::with_capacity(raw.len());

    for (index, row) in raw.iter().enumerate() {
        let position = index + 1;
        match parse(row, position) {
            Ok(record) => parsed.push(record),
            Err(err) => reject(err, config, recorder, entry, key(row, position))?,
        }
    }

    Ok(parsed)
}

fn parse_demographics(
    raw: &[RawDemographicRow],
    config: &CleaningConfig,
    recorder: &mut AuditRecorder,
) -> Result<DemographicIndex> {
    let mut index = DemographicIndex::new();

    for (i, row) in raw.iter().enumerate() {
        let position = i + 1;
        let key = RecordKey::from_raw_demographic(row, position);

        let outcome = HouseholdDemographic::parse(row, position).and_then(|demo| {
            index.insert(demo).map_err(|duplicate| {
                ParseError::new(
                    Table::Demographics,
                    position,
                    "household_key",
                    format!("duplicates household {}", duplicate.household_key),
                )
            })
        });

        if let Err(err) = outcome {
            reject(err, config, recorder, DEMOGRAPHICS_REJECTED, key)?;
        }
    }

    Ok(index)
}

/// Fail the run or count the row, per policy
fn reject(
    err: ParseError,
    config: &CleaningConfig,
    recorder: &mut AuditRecorder,
    entry: &str,
    key: RecordKey,
) -> Result<()> {
    match config.parse_error_policy {
        ParseErrorPolicy::Fail => Err(err.into()),
        ParseErrorPolicy::Skip => {
            warn!(error = %err, "skipping malformed row");
            recorder.record(entry, key);
            Ok(())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
