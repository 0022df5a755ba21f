// 🏷️ Cleaning Rules - Rules as data, applied in a fixed order
// Each rule is a total function over one well-formed record: filters may
// exclude it, transforms may rewrite it, neither can fail.

use crate::audit::{AuditKind, AuditRecorder, AuditReport};
use crate::config::{CleaningConfig, KeywordMatch};
use crate::error::Table;
use crate::records::TransactionRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// RULE IDENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    PositiveDiscount,
    NonMerchandise,
    LoyaltyToken,
    QuantityCap,
    NormalizeDescription,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::PositiveDiscount => "positive_discount",
            RuleId::NonMerchandise => "non_merchandise",
            RuleId::LoyaltyToken => "loyalty_token",
            RuleId::QuantityCap => "quantity_cap",
            RuleId::NormalizeDescription => "normalize_description",
        }
    }

    /// Order the cleaning log applies its filters in
    pub fn standard_order() -> &'static [RuleId] {
        &[
            RuleId::PositiveDiscount,
            RuleId::NonMerchandise,
            RuleId::LoyaltyToken,
            RuleId::QuantityCap,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// May exclude a record, never rewrites it
    Filter,
    /// May rewrite a field, never excludes
    Transform,
}

/// Outcome of one rule on one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Exclude,
    Rewritten,
}

// ============================================================================
// RULE TRAIT
// ============================================================================

/// Rule - one step of the cleaning pass
///
/// Implementations must be pure: the same record always yields the same
/// verdict, regardless of which worker thread evaluates it.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable description used in the audit report
    fn description(&self) -> &str;

    fn kind(&self) -> RuleKind;

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict;
}

fn filter_verdict(excluded: bool) -> Verdict {
    if excluded {
        Verdict::Exclude
    } else {
        Verdict::Keep
    }
}

// ============================================================================
// FILTER RULES
// ============================================================================

/// Rule 1: positive discounts are surcharges (e.g. bottle deposits) mis-mapped
/// into the discount columns
#[derive(Debug, Clone, Default)]
pub struct PositiveDiscountFilter;

impl PositiveDiscountFilter {
    pub fn excludes(&self, record: &TransactionRecord) -> bool {
        record.retail_disc > 0.0 || record.coupon_disc > 0.0
    }
}

impl Rule for PositiveDiscountFilter {
    fn id(&self) -> &str {
        RuleId::PositiveDiscount.as_str()
    }

    fn description(&self) -> &str {
        "Positive retail or coupon discount (surcharge recorded as a discount)"
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Filter
    }

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict {
        filter_verdict(self.excludes(record))
    }
}

/// Rule 2: fuel and other non-merchandise commodities
#[derive(Debug, Clone)]
pub struct NonMerchandiseFilter {
    /// Upper-cased keywords
    keywords: Vec<String>,
    mode: KeywordMatch,
    description: String,
}

impl NonMerchandiseFilter {
    pub fn new(keywords: Vec<String>, mode: KeywordMatch) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.trim().to_uppercase()).collect();
        let description = format!(
            "Non-merchandise commodity ({} match on {})",
            match mode {
                KeywordMatch::Substring => "substring",
                KeywordMatch::Exact => "exact",
            },
            keywords.join(", ")
        );

        NonMerchandiseFilter {
            keywords,
            mode,
            description,
        }
    }

    /// Case-insensitive keyword check against the commodity description
    pub fn matches(&self, commodity_desc: &str) -> bool {
        let text = commodity_desc.trim().to_uppercase();

        match self.mode {
            KeywordMatch::Substring => self.keywords.iter().any(|k| text.contains(k.as_str())),
            KeywordMatch::Exact => self.keywords.iter().any(|k| text == *k),
        }
    }
}

impl Rule for NonMerchandiseFilter {
    fn id(&self) -> &str {
        RuleId::NonMerchandise.as_str()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Filter
    }

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict {
        filter_verdict(self.matches(&record.commodity_desc))
    }
}

/// Rule 3: loyalty tokens show up as many units at a fraction of a cent each
#[derive(Debug, Clone)]
pub struct LoyaltyTokenFilter {
    unit_price_floor: f64,
    description: String,
}

impl LoyaltyTokenFilter {
    pub fn new(unit_price_floor: f64) -> Self {
        LoyaltyTokenFilter {
            unit_price_floor,
            description: format!(
                "Unit price below ${:.2} on a positive sale (loyalty-token line)",
                unit_price_floor
            ),
        }
    }

    pub fn excludes(&self, record: &TransactionRecord) -> bool {
        if record.sales_value <= 0.0 {
            return false;
        }

        // unit_price() is None for quantity <= 0, which this rule never excludes
        match record.unit_price() {
            Some(price) => price < self.unit_price_floor,
            None => false,
        }
    }
}

impl Rule for LoyaltyTokenFilter {
    fn id(&self) -> &str {
        RuleId::LoyaltyToken.as_str()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Filter
    }

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict {
        filter_verdict(self.excludes(record))
    }
}

/// Rule 4: implausible single-scan quantities
#[derive(Debug, Clone)]
pub struct QuantityCapFilter {
    cap: i32,
    cap_returns: bool,
    description: String,
}

impl QuantityCapFilter {
    pub fn new(cap: i32, cap_returns: bool) -> Self {
        let description = if cap_returns {
            format!("Absolute quantity above {} units (safety cap, returns included)", cap)
        } else {
            format!("Quantity above {} units (safety cap)", cap)
        };

        QuantityCapFilter {
            cap,
            cap_returns,
            description,
        }
    }

    pub fn excludes(&self, record: &TransactionRecord) -> bool {
        if record.is_return() {
            return self.cap_returns && i64::from(record.quantity).abs() > i64::from(self.cap);
        }
        record.quantity > self.cap
    }
}

impl Rule for QuantityCapFilter {
    fn id(&self) -> &str {
        RuleId::QuantityCap.as_str()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Filter
    }

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict {
        filter_verdict(self.excludes(record))
    }
}

// ============================================================================
// TRANSFORM RULES
// ============================================================================

/// Trims, collapses internal whitespace and upper-cases commodity descriptions
#[derive(Debug, Clone, Default)]
pub struct NormalizeDescription;

impl NormalizeDescription {
    pub fn normalize(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }
}

impl Rule for NormalizeDescription {
    fn id(&self) -> &str {
        RuleId::NormalizeDescription.as_str()
    }

    fn description(&self) -> &str {
        "Commodity description whitespace and case normalized"
    }

    fn kind(&self) -> RuleKind {
        RuleKind::Transform
    }

    fn evaluate(&self, record: &mut TransactionRecord) -> Verdict {
        let normalized = Self::normalize(&record.commodity_desc);
        if normalized == record.commodity_desc {
            return Verdict::Keep;
        }

        record.commodity_desc = normalized;
        Verdict::Rewritten
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Ordered collection of rules, fixed for a run
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// The four filters of the cleaning log, in their documented order
    pub fn standard(config: &CleaningConfig) -> Self {
        Self::from_ids(RuleId::standard_order(), config)
    }

    /// Rules named by `config.rule_order`
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::from_ids(&config.rule_order, config)
    }

    pub fn from_ids(ids: &[RuleId], config: &CleaningConfig) -> Self {
        let mut set = RuleSet::new();
        for id in ids {
            set.push(build_rule(*id, config));
        }
        set
    }

    /// Append a rule; it runs after every rule already in the set
    pub fn push(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn build_rule(id: RuleId, config: &CleaningConfig) -> Box<dyn Rule> {
    match id {
        RuleId::PositiveDiscount => Box::new(PositiveDiscountFilter),
        RuleId::NonMerchandise => Box::new(NonMerchandiseFilter::new(
            config.normalized_keywords(),
            config.keyword_match,
        )),
        RuleId::LoyaltyToken => Box::new(LoyaltyTokenFilter::new(config.unit_price_floor)),
        RuleId::QuantityCap => {
            Box::new(QuantityCapFilter::new(config.quantity_cap, config.cap_returns))
        }
        RuleId::NormalizeDescription => Box::new(NormalizeDescription),
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub survivors: Vec<TransactionRecord>,
    pub audit: AuditReport,
}

pub struct RuleEngine<'a> {
    rules: &'a RuleSet,
    sample_size: usize,
    chunk_size: usize,
}

impl<'a> RuleEngine<'a> {
    pub fn new(rules: &'a RuleSet, sample_size: usize, chunk_size: usize) -> Self {
        RuleEngine {
            rules,
            sample_size,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run every record through the rules and report what each rule did
    pub fn apply(&self, records: Vec<TransactionRecord>) -> RuleOutcome {
        let mut recorder = AuditRecorder::new(self.sample_size);
        let survivors = self.apply_into(records, &mut recorder);

        RuleOutcome {
            survivors,
            audit: recorder.report(),
        }
    }

    /// Same as `apply`, recording into a caller-owned recorder
    ///
    /// Chunks are evaluated in parallel; survivors and partial audits are
    /// stitched back together in input order.
    pub fn apply_into(
        &self,
        records: Vec<TransactionRecord>,
        recorder: &mut AuditRecorder,
    ) -> Vec<TransactionRecord> {
        self.register(recorder);

        let input = records.len();
        let chunks = split_chunks(records, self.chunk_size);

        let partials: Vec<(Vec<TransactionRecord>, AuditRecorder)> = chunks
            .into_par_iter()
            .map(|chunk| self.evaluate_chunk(chunk))
            .collect();

        let mut survivors = Vec::with_capacity(input);
        for (kept, partial) in partials {
            survivors.extend(kept);
            recorder.merge(partial);
        }

        for rule in self.rules.iter() {
            debug!(rule = rule.id(), affected = recorder.count(rule.id()), "rule applied");
        }
        info!(input, survivors = survivors.len(), rules = self.rules.len(), "rule pass complete");

        survivors
    }

    fn register(&self, recorder: &mut AuditRecorder) {
        for rule in self.rules.iter() {
            let kind = match rule.kind() {
                RuleKind::Filter => AuditKind::Filter,
                RuleKind::Transform => AuditKind::Transform,
            };
            recorder.register(rule.id(), rule.description(), kind, Table::Transactions);
        }
    }

    fn evaluate_chunk(
        &self,
        chunk: Vec<TransactionRecord>,
    ) -> (Vec<TransactionRecord>, AuditRecorder) {
        let mut partial = AuditRecorder::new(self.sample_size);
        self.register(&mut partial);

        let mut kept = Vec::with_capacity(chunk.len());
        for record in chunk {
            if let Some(record) = self.evaluate_record(record, &mut partial) {
                kept.push(record);
            }
        }

        (kept, partial)
    }

    /// Short-circuits: an excluded record is not seen by later rules
    fn evaluate_record(
        &self,
        mut record: TransactionRecord,
        recorder: &mut AuditRecorder,
    ) -> Option<TransactionRecord> {
        for rule in self.rules.iter() {
            match rule.evaluate(&mut record) {
                Verdict::Keep => {}
                Verdict::Rewritten => recorder.record(rule.id(), record.key()),
                Verdict::Exclude if rule.kind() == RuleKind::Filter => {
                    recorder.record(rule.id(), record.key());
                    return None;
                }
                // Transforms never exclude
                Verdict::Exclude => {}
            }
        }

        Some(record)
    }
}

fn split_chunks(records: Vec<TransactionRecord>, size: usize) -> Vec<Vec<TransactionRecord>> {
    let mut chunks = Vec::with_capacity(records.len() / size + 1);
    let mut iter = records.into_iter();

    loop {
        let chunk: Vec<TransactionRecord> = iter.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }

    chunks
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(
        row: usize,
        desc: &str,
        quantity: i32,
        sales: f64,
        retail: f64,
        coupon: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            row,
            household_key: 1,
            basket_id: 10,
            product_id: 1000 + row as u64,
            commodity_desc: desc.to_string(),
            quantity,
            sales_value: sales,
            retail_disc: retail,
            coupon_disc: coupon,
            coupon_match_disc: 0.0,
            day: 1,
            store_id: None,
            week_no: None,
            trans_time: None,
        }
    }

    fn grocery(row: usize) -> TransactionRecord {
        record(row, "SOFT DRINKS", 1, 2.5, -0.3, 0.0)
    }

    fn standard() -> RuleSet {
        RuleSet::standard(&CleaningConfig::default())
    }

    #[test]
    fn test_positive_discount_filter() {
        let rule = PositiveDiscountFilter;

        let mut surcharge = grocery(1);
        surcharge.retail_disc = 0.01;
        assert_eq!(rule.evaluate(&mut surcharge), Verdict::Exclude);

        let mut coupon_surcharge = grocery(2);
        coupon_surcharge.coupon_disc = 0.5;
        assert_eq!(rule.evaluate(&mut coupon_surcharge), Verdict::Exclude);

        let mut normal = grocery(3);
        normal.retail_disc = -0.01;
        normal.coupon_disc = -0.02;
        assert_eq!(rule.evaluate(&mut normal), Verdict::Keep);
    }

    #[test]
    fn test_non_merchandise_substring_policy() {
        let rule = NonMerchandiseFilter::new(
            vec!["FUEL".to_string(), "GASOLINE".to_string()],
            KeywordMatch::Substring,
        );

        assert!(rule.matches("PREMIUM FUEL"));
        assert!(rule.matches("FUEL-FREE SNACK"));
        assert!(rule.matches("Gasoline-Reg Unleaded"));
        assert!(!rule.matches("SOFT DRINKS"));
    }

    #[test]
    fn test_non_merchandise_exact_policy() {
        let rule = NonMerchandiseFilter::new(vec!["fuel".to_string()], KeywordMatch::Exact);

        assert!(rule.matches(" Fuel "));
        assert!(!rule.matches("PREMIUM FUEL"));
        assert!(!rule.matches("FUEL-FREE SNACK"));
    }

    #[test]
    fn test_loyalty_token_filter() {
        let rule = LoyaltyTokenFilter::new(0.05);

        assert!(rule.excludes(&record(1, "COUPON/MISC ITEMS", 100, 2.00, 0.0, 0.0)));
        assert!(!rule.excludes(&record(2, "CANDY", 1, 0.10, 0.0, 0.0)));
        // quantity 0 cannot be divided; never excluded here
        assert!(!rule.excludes(&record(3, "CANDY", 0, 5.00, 0.0, 0.0)));
        // exactly at the floor survives
        assert!(!rule.excludes(&record(4, "CANDY", 100, 5.00, 0.0, 0.0)));
        // refunds and zero-value lines are out of scope for this rule
        assert!(!rule.excludes(&record(5, "CANDY", 100, 0.0, 0.0, 0.0)));
        assert!(!rule.excludes(&record(6, "CANDY", -100, -2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_quantity_cap_filter() {
        let rule = QuantityCapFilter::new(150, false);

        assert!(rule.excludes(&record(1, "X", 151, 10.0, 0.0, 0.0)));
        assert!(!rule.excludes(&record(2, "X", 150, 10.0, 0.0, 0.0)));
        assert!(!rule.excludes(&record(3, "X", -200, -10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_quantity_cap_can_include_returns() {
        let rule = QuantityCapFilter::new(150, true);

        assert!(rule.excludes(&record(1, "X", -200, -10.0, 0.0, 0.0)));
        assert!(!rule.excludes(&record(2, "X", -150, -10.0, 0.0, 0.0)));
        assert!(rule.excludes(&record(3, "X", 151, 10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_normalize_description_rewrites_only_when_needed() {
        let rule = NormalizeDescription;

        let mut messy = record(1, "  soft   drinks ", 1, 1.0, 0.0, 0.0);
        assert_eq!(rule.evaluate(&mut messy), Verdict::Rewritten);
        assert_eq!(messy.commodity_desc, "SOFT DRINKS");

        let mut clean = record(2, "SOFT DRINKS", 1, 1.0, 0.0, 0.0);
        assert_eq!(rule.evaluate(&mut clean), Verdict::Keep);
    }

    #[test]
    fn test_rule_set_from_config_order() {
        let config = CleaningConfig {
            rule_order: vec![RuleId::NormalizeDescription, RuleId::QuantityCap],
            ..CleaningConfig::default()
        };

        let set = RuleSet::from_config(&config);
        assert_eq!(set.ids(), vec!["normalize_description", "quantity_cap"]);
        assert_eq!(
            standard().ids(),
            vec!["positive_discount", "non_merchandise", "loyalty_token", "quantity_cap"]
        );
    }

    #[test]
    fn test_short_circuit_attributes_row_to_first_rule() {
        let rules = standard();
        let engine = RuleEngine::new(&rules, 10, 64);

        // surcharge AND fuel AND over the cap: only rule 1 counts it
        let records = vec![record(1, "PREMIUM FUEL", 500, 40.0, 0.5, 0.0), grocery(2)];
        let outcome = engine.apply(records);

        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.audit.count("positive_discount"), 1);
        assert_eq!(outcome.audit.count("non_merchandise"), 0);
        assert_eq!(outcome.audit.count("quantity_cap"), 0);
    }

    #[test]
    fn test_apply_reports_every_rule_in_order() {
        let rules = standard();
        let engine = RuleEngine::new(&rules, 10, 2);

        let records = vec![
            grocery(1),
            record(2, "GASOLINE-REG UNLEADED", 1, 30.0, 0.0, 0.0),
            record(3, "COUPON/MISC ITEMS", 100, 2.0, 0.0, 0.0),
            record(4, "BAKED BREAD", 151, 100.0, 0.0, 0.0),
            record(5, "BAKED BREAD", -200, -20.0, 0.0, 0.0),
            record(6, "BAKED BREAD", 2, 3.0, 0.2, 0.0),
        ];
        let outcome = engine.apply(records);

        let ids: Vec<&str> = outcome.audit.entries().iter().map(|e| e.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["positive_discount", "non_merchandise", "loyalty_token", "quantity_cap"]
        );

        assert_eq!(outcome.audit.count("positive_discount"), 1);
        assert_eq!(outcome.audit.count("non_merchandise"), 1);
        assert_eq!(outcome.audit.count("loyalty_token"), 1);
        assert_eq!(outcome.audit.count("quantity_cap"), 1);

        let rows: Vec<usize> = outcome.survivors.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 5]);
        assert_eq!(outcome.audit.entry("non_merchandise").unwrap().sample[0].row, 2);
    }

    #[test]
    fn test_transform_counts_do_not_remove_rows() {
        let config = CleaningConfig {
            rule_order: vec![RuleId::NormalizeDescription, RuleId::NonMerchandise],
            ..CleaningConfig::default()
        };
        let rules = RuleSet::from_config(&config);
        let engine = RuleEngine::new(&rules, 10, 8);

        let records = vec![
            record(1, " premium  fuel", 1, 30.0, 0.0, 0.0),
            record(2, "bread", 1, 2.0, 0.0, 0.0),
            record(3, "BREAD", 1, 2.0, 0.0, 0.0),
        ];
        let outcome = engine.apply(records);

        assert_eq!(outcome.audit.count("normalize_description"), 2);
        assert_eq!(outcome.audit.count("non_merchandise"), 1);
        assert_eq!(outcome.audit.filtered_total(), 1);
        assert_eq!(outcome.survivors.len(), 2);
        assert_eq!(outcome.survivors[0].commodity_desc, "BREAD");
    }

    #[test]
    fn test_empty_input() {
        let rules = standard();
        let outcome = RuleEngine::new(&rules, 10, 16).apply(Vec::new());

        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.audit.entries().len(), 4);
        assert_eq!(outcome.audit.total_affected(), 0);
    }

    #[test]
    fn test_split_chunks() {
        let records: Vec<TransactionRecord> = (1..=5).map(grocery).collect();
        let chunks = split_chunks(records, 2);

        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    fn arb_record() -> impl Strategy<Value = (String, i32, f64, f64, f64)> {
        (
            prop::sample::select(vec![
                "SOFT DRINKS".to_string(),
                "PREMIUM FUEL".to_string(),
                "COUPON/MISC ITEMS".to_string(),
                "FUEL-FREE SNACK".to_string(),
                "BAKED BREAD".to_string(),
            ]),
            -300i32..300,
            -20.0f64..60.0,
            -2.0f64..0.5,
            -2.0f64..0.5,
        )
    }

    proptest! {
        #[test]
        fn prop_no_row_lost_or_double_counted(
            rows in prop::collection::vec(arb_record(), 0..200),
        ) {
            let records: Vec<TransactionRecord> = rows
                .into_iter()
                .enumerate()
                .map(|(i, (desc, q, s, r, c))| record(i + 1, &desc, q, s, r, c))
                .collect();
            let input = records.len();

            let rules = standard();
            let outcome = RuleEngine::new(&rules, 5, 7).apply(records);

            prop_assert_eq!(outcome.survivors.len() + outcome.audit.filtered_total(), input);
        }

        #[test]
        fn prop_chunking_does_not_change_result(
            rows in prop::collection::vec(arb_record(), 0..200),
            chunk in 1usize..50,
        ) {
            let records: Vec<TransactionRecord> = rows
                .into_iter()
                .enumerate()
                .map(|(i, (desc, q, s, r, c))| record(i + 1, &desc, q, s, r, c))
                .collect();

            let rules = standard();
            let sequential = RuleEngine::new(&rules, 5, usize::MAX).apply(records.clone());
            let chunked = RuleEngine::new(&rules, 5, chunk).apply(records);

            prop_assert_eq!(sequential.survivors, chunked.survivors);
            prop_assert_eq!(sequential.audit, chunked.audit);
        }

        #[test]
        fn prop_survivors_satisfy_cleaned_invariants(
            rows in prop::collection::vec(arb_record(), 0..200),
        ) {
            let records: Vec<TransactionRecord> = rows
                .into_iter()
                .enumerate()
                .map(|(i, (desc, q, s, r, c))| record(i + 1, &desc, q, s, r, c))
                .collect();

            let rules = standard();
            let outcome = RuleEngine::new(&rules, 5, 16).apply(records);

            for r in &outcome.survivors {
                prop_assert!(r.retail_disc <= 0.0 && r.coupon_disc <= 0.0);
                prop_assert!(!r.commodity_desc.contains("FUEL"));
                prop_assert!(r.quantity <= 150);
                if let Some(price) = r.unit_price() {
                    prop_assert!(price >= 0.05 || r.sales_value <= 0.0);
                }
            }
        }
    }
}
