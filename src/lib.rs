// Basket Hygiene - Core Library
// Transaction data-quality pipeline: parse, filter, enrich, audit.
// Exposes all modules for use in the CLI and tests.

pub mod error;       // Parse and configuration errors
pub mod config;      // Cleaning thresholds (TOML)
pub mod records;     // Record Model
pub mod rules;       // Rule Engine
pub mod audit;       // Audit Recorder
pub mod temporal;    // Day-index anchoring + calendar dimension
pub mod enrichment;  // Demographic left join
pub mod pipeline;    // Orchestrator
pub mod ingest;      // CSV → raw rows
pub mod sink;        // Cleaned dataset + audit artifacts → disk

// Re-export commonly used types
pub use error::{ConfigurationError, ParseError, PipelineError, Table};
pub use config::{CleaningConfig, KeywordMatch, ParseErrorPolicy};
pub use records::{
    Campaign, CouponRedemption, HouseholdDemographic, ProductCatalog, RawCampaignRow,
    RawDemographicRow, RawProductRow, RawRedemptionRow, RawTransactionRow, RecordKey,
    TransactionRecord,
};
pub use rules::{
    LoyaltyTokenFilter, NonMerchandiseFilter, NormalizeDescription, PositiveDiscountFilter,
    QuantityCapFilter, Rule, RuleEngine, RuleId, RuleKind, RuleOutcome, RuleSet, Verdict,
};
pub use audit::{AuditEntry, AuditKind, AuditRecorder, AuditReport};
pub use temporal::{calendar_dimension, clock_time, CalendarDay, DateAnchor};
pub use enrichment::{
    anchor_dates, campaign_dimension, campaign_type_label, household_dimension, join,
    redemption_facts, Attribute, CampaignRow, DemographicIndex, DemographicProfile,
    EnrichedRecord, HouseholdRow, RedemptionRow,
};
pub use pipeline::{
    run, run_with_promotions, Pipeline, PipelineOutput, PromotionRows, CAMPAIGNS_REJECTED,
    DEMOGRAPHICS_REJECTED, PARSE_REJECTED, REDEMPTIONS_REJECTED,
};
pub use ingest::{
    read_campaigns, read_demographics, read_product_catalog, read_redemptions,
    read_transactions,
};
pub use sink::{write_all, CleanedRow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
