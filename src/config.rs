// ⚙️ Cleaning Configuration - Thresholds as data, not constants
// Every cut-off the cleaning log talks about ($0.05, 150 units, FUEL/GASOLINE,
// day 1 = 2024-01-01) is a field here with a serde default.

use crate::error::ConfigurationError;
use crate::rules::RuleId;
use crate::temporal::DateAnchor;
use anyhow::{Context as AnyhowContext, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

// ============================================================================
// POLICIES
// ============================================================================

/// How non-merchandise keywords are compared against the commodity description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    /// Description contains the keyword anywhere ("FUEL-FREE SNACK" matches FUEL)
    Substring,
    /// Whole description equals the keyword, ignoring case and outer whitespace
    Exact,
}

/// What happens to a raw row that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorPolicy {
    /// Abort the run on the first malformed row
    Fail,
    /// Drop the row and count it under the `parse_rejected` audit entry
    Skip,
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Loyalty-token unit price floor (dollars per unit)
    #[serde(default = "default_unit_price_floor")]
    pub unit_price_floor: f64,

    /// Largest plausible single-scan quantity
    #[serde(default = "default_quantity_cap")]
    pub quantity_cap: i32,

    /// Commodity keywords marking fuel and other non-merchandise lines
    #[serde(default = "default_keywords")]
    pub non_merchandise_keywords: BTreeSet<String>,

    #[serde(default = "default_keyword_match")]
    pub keyword_match: KeywordMatch,

    /// Apply the quantity cap to |quantity| of returns as well
    #[serde(default)]
    pub cap_returns: bool,

    /// Value rendered for demographic attributes that are not known
    #[serde(default = "default_sentinel")]
    pub demographic_sentinel: String,

    /// Day-index that maps onto `anchor_date`
    #[serde(default = "default_anchor_day")]
    pub anchor_day: u16,

    #[serde(default = "default_anchor_date")]
    pub anchor_date: NaiveDate,

    /// Max record keys kept per audit entry
    #[serde(default = "default_sample_size")]
    pub audit_sample_size: usize,

    /// Records per parallel work unit in the rule pass
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_parse_error_policy")]
    pub parse_error_policy: ParseErrorPolicy,

    /// Rules in execution order
    #[serde(default = "default_rule_order")]
    pub rule_order: Vec<RuleId>,
}

fn default_unit_price_floor() -> f64 {
    0.05
}

fn default_quantity_cap() -> i32 {
    150
}

fn default_keywords() -> BTreeSet<String> {
    ["FUEL", "GASOLINE"].iter().map(|k| k.to_string()).collect()
}

fn default_keyword_match() -> KeywordMatch {
    KeywordMatch::Substring
}

fn default_sentinel() -> String {
    "Unknown".to_string()
}

fn default_anchor_day() -> u16 {
    1
}

fn default_anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_sample_size() -> usize {
    10
}

fn default_chunk_size() -> usize {
    4096
}

fn default_parse_error_policy() -> ParseErrorPolicy {
    ParseErrorPolicy::Fail
}

fn default_rule_order() -> Vec<RuleId> {
    RuleId::standard_order().to_vec()
}

impl Default for CleaningConfig {
    fn default() -> Self {
        CleaningConfig {
            unit_price_floor: default_unit_price_floor(),
            quantity_cap: default_quantity_cap(),
            non_merchandise_keywords: default_keywords(),
            keyword_match: default_keyword_match(),
            cap_returns: false,
            demographic_sentinel: default_sentinel(),
            anchor_day: default_anchor_day(),
            anchor_date: default_anchor_date(),
            audit_sample_size: default_sample_size(),
            chunk_size: default_chunk_size(),
            parse_error_policy: default_parse_error_policy(),
            rule_order: default_rule_order(),
        }
    }
}

impl CleaningConfig {
    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Reject thresholds that would make the rules meaningless
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if !self.unit_price_floor.is_finite() || self.unit_price_floor < 0.0 {
            return Err(ConfigurationError::new(
                "unit_price_floor",
                format!("must be a finite, non-negative amount, got {}", self.unit_price_floor),
            ));
        }

        if self.quantity_cap < 1 {
            return Err(ConfigurationError::new(
                "quantity_cap",
                format!("must be at least 1, got {}", self.quantity_cap),
            ));
        }

        if self.non_merchandise_keywords.is_empty() {
            return Err(ConfigurationError::new(
                "non_merchandise_keywords",
                "at least one keyword is required",
            ));
        }

        if self.non_merchandise_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigurationError::new(
                "non_merchandise_keywords",
                "keywords must not be blank",
            ));
        }

        if self.demographic_sentinel.trim().is_empty() {
            return Err(ConfigurationError::new(
                "demographic_sentinel",
                "must not be blank",
            ));
        }

        // Every representable day-index must land on a valid calendar date
        self.date_anchor()?;

        if self.chunk_size == 0 {
            return Err(ConfigurationError::new("chunk_size", "must be at least 1"));
        }

        if self.rule_order.is_empty() {
            return Err(ConfigurationError::new(
                "rule_order",
                "at least one rule is required",
            ));
        }

        let mut seen = BTreeSet::new();
        for id in &self.rule_order {
            if !seen.insert(*id) {
                return Err(ConfigurationError::new(
                    "rule_order",
                    format!("rule `{}` listed more than once", id.as_str()),
                ));
            }
        }

        Ok(())
    }

    pub fn date_anchor(&self) -> std::result::Result<DateAnchor, ConfigurationError> {
        DateAnchor::new(self.anchor_day, self.anchor_date)
    }

    /// Keywords upper-cased for case-insensitive matching
    pub fn normalized_keywords(&self) -> Vec<String> {
        self.non_merchandise_keywords
            .iter()
            .map(|k| k.trim().to_uppercase())
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
