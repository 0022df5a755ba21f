// 📋 Audit Recorder - Per-rule counts and samples of affected rows
// The structured twin of the human-written data quality log: every row a
// rule removes or rewrites is counted here, in rule execution order.

use crate::error::Table;
use crate::records::RecordKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// AUDIT ENTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Row rejected at the parse boundary
    Parse,
    /// Row excluded from the cleaned dataset
    Filter,
    /// Row kept, one or more fields rewritten
    Transform,
}

impl AuditKind {
    fn action(&self) -> &str {
        match self {
            AuditKind::Parse => "Rejected as malformed",
            AuditKind::Filter => "Excluded from cleaned dataset",
            AuditKind::Transform => "Rewritten in place, row retained",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub rule_id: String,
    pub description: String,
    pub kind: AuditKind,
    pub table: Table,
    pub rows_affected: usize,
    /// First rows affected, in input order
    pub sample: Vec<RecordKey>,
}

impl AuditEntry {
    /// Does this entry account for a transaction row missing from the output?
    pub fn removes_transactions(&self) -> bool {
        self.table == Table::Transactions && self.kind != AuditKind::Transform
    }
}

// ============================================================================
// AUDIT RECORDER
// ============================================================================

/// AuditRecorder - accumulates entries for one run (or one chunk of a run)
///
/// Not shared between threads: each parallel worker fills its own recorder and
/// the partials are combined with `merge` in input order.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    sample_size: usize,
    entries: Vec<AuditEntry>,
    index: HashMap<String, usize>,
}

impl AuditRecorder {
    pub fn new(sample_size: usize) -> Self {
        AuditRecorder {
            sample_size,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Reserve an entry so it is reported (in registration order) even at zero
    pub fn register(&mut self, rule_id: &str, description: &str, kind: AuditKind, table: Table) {
        if self.index.contains_key(rule_id) {
            return;
        }

        self.index.insert(rule_id.to_string(), self.entries.len());
        self.entries.push(AuditEntry {
            rule_id: rule_id.to_string(),
            description: description.to_string(),
            kind,
            table,
            rows_affected: 0,
            sample: Vec::new(),
        });
    }

    /// Count one affected row; unregistered ids become transaction filters
    pub fn record(&mut self, rule_id: &str, key: RecordKey) {
        if !self.index.contains_key(rule_id) {
            self.register(rule_id, rule_id, AuditKind::Filter, Table::Transactions);
        }

        if let Some(&position) = self.index.get(rule_id) {
            let entry = &mut self.entries[position];
            entry.rows_affected += 1;
            if entry.sample.len() < self.sample_size {
                entry.sample.push(key);
            }
        }
    }

    /// Fold a later partial recorder into this one
    ///
    /// Counts are summed by rule id; samples are appended after this
    /// recorder's own, so merging chunk partials in chunk order reproduces
    /// the sequential result exactly.
    pub fn merge(&mut self, other: AuditRecorder) {
        for entry in other.entries {
            self.register(&entry.rule_id, &entry.description, entry.kind, entry.table);

            if let Some(&position) = self.index.get(&entry.rule_id) {
                let target = &mut self.entries[position];
                target.rows_affected += entry.rows_affected;

                let room = self.sample_size.saturating_sub(target.sample.len());
                target.sample.extend(entry.sample.into_iter().take(room));
            }
        }
    }

    pub fn count(&self, rule_id: &str) -> usize {
        self.index
            .get(rule_id)
            .map(|&position| self.entries[position].rows_affected)
            .unwrap_or(0)
    }

    /// Close the recorder and hand over its entries
    pub fn report(self) -> AuditReport {
        AuditReport {
            entries: self.entries,
        }
    }
}

// ============================================================================
// AUDIT REPORT
// ============================================================================

/// AuditReport - ordered, immutable result of a run's audit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    entries: Vec<AuditEntry>,
}

impl AuditReport {
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn entry(&self, rule_id: &str) -> Option<&AuditEntry> {
        self.entries.iter().find(|e| e.rule_id == rule_id)
    }

    /// Rows affected by `rule_id`, zero when it never ran
    pub fn count(&self, rule_id: &str) -> usize {
        self.entry(rule_id).map(|e| e.rows_affected).unwrap_or(0)
    }

    pub fn total_affected(&self) -> usize {
        self.entries.iter().map(|e| e.rows_affected).sum()
    }

    /// Transaction rows that did not make it into the cleaned dataset
    pub fn filtered_total(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.removes_transactions())
            .map(|e| e.rows_affected)
            .sum()
    }

    /// Render the report as a Markdown data quality log
    pub fn to_changelog(&self) -> String {
        let mut out = String::new();

        out.push_str("# Data Quality Log\n\n");
        out.push_str("| Issue | Rule | Table | Rows Affected | Action |\n");
        out.push_str("|---|---|---|---|---|\n");
        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "| {} | `{}` | {} | {} | {} |\n",
                i + 1,
                entry.rule_id,
                entry.table,
                group_thousands(entry.rows_affected),
                entry.kind.action()
            ));
        }

        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!("\n## Issue {}: {}\n\n", i + 1, entry.description));
            out.push_str(&format!("- **Rule:** `{}`\n", entry.rule_id));
            out.push_str(&format!(
                "- **Rows Affected:** {}\n",
                group_thousands(entry.rows_affected)
            ));
            out.push_str(&format!("- **Action:** {}\n", entry.kind.action()));

            if !entry.sample.is_empty() {
                let rows: Vec<String> = entry.sample.iter().map(|k| k.row.to_string()).collect();
                out.push_str(&format!("- **Sample rows:** {}\n", rows.join(", ")));
            }
        }

        out
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(row: usize) -> RecordKey {
        RecordKey {
            row,
            household_key: Some(1),
            product_id: Some(100),
        }
    }

    #[test]
    fn test_record_counts_and_bounds_sample() {
        let mut recorder = AuditRecorder::new(2);
        recorder.register(
            "quantity_cap",
            "Quantity above cap",
            AuditKind::Filter,
            Table::Transactions,
        );

        for row in 1..=5 {
            recorder.record("quantity_cap", key(row));
        }

        let report = recorder.report();
        let entry = report.entry("quantity_cap").unwrap();
        assert_eq!(entry.rows_affected, 5);
        assert_eq!(entry.sample, vec![key(1), key(2)]);
    }

    #[test]
    fn test_report_keeps_registration_order_and_zero_entries() {
        let mut recorder = AuditRecorder::new(5);
        recorder.register("a", "first", AuditKind::Filter, Table::Transactions);
        recorder.register("b", "second", AuditKind::Filter, Table::Transactions);
        recorder.record("b", key(1));

        let report = recorder.report();
        let ids: Vec<&str> = report.entries().iter().map(|e| e.rule_id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.count("a"), 0);
        assert_eq!(report.count("b"), 1);
    }

    #[test]
    fn test_unregistered_rule_is_created_on_first_record() {
        let mut recorder = AuditRecorder::new(5);
        recorder.record("ad_hoc", key(3));

        assert_eq!(recorder.count("ad_hoc"), 1);
        let report = recorder.report();
        assert_eq!(report.entry("ad_hoc").unwrap().kind, AuditKind::Filter);
    }

    #[test]
    fn test_merge_matches_sequential_recording() {
        let rows: Vec<(usize, &str)> =
            vec![(1, "a"), (2, "b"), (3, "a"), (4, "a"), (5, "b"), (6, "a")];

        let mut sequential = AuditRecorder::new(3);
        for (row, id) in &rows {
            sequential.record(id, key(*row));
        }

        let mut merged = AuditRecorder::new(3);
        for chunk in rows.chunks(2) {
            let mut partial = AuditRecorder::new(3);
            for (row, id) in chunk {
                partial.record(id, key(*row));
            }
            merged.merge(partial);
        }

        assert_eq!(merged.report(), sequential.report());
    }

    #[test]
    fn test_filtered_total_ignores_transforms_and_other_tables() {
        let mut recorder = AuditRecorder::new(1);
        recorder.register("parse_rejected", "Malformed", AuditKind::Parse, Table::Transactions);
        recorder.register("drop", "Drop", AuditKind::Filter, Table::Transactions);
        recorder.register("tidy", "Tidy", AuditKind::Transform, Table::Transactions);
        recorder.register("demo", "Bad demographics", AuditKind::Parse, Table::Demographics);

        recorder.record("parse_rejected", key(1));
        recorder.record("drop", key(2));
        recorder.record("drop", key(3));
        recorder.record("tidy", key(4));
        recorder.record("demo", key(1));

        let report = recorder.report();
        assert_eq!(report.total_affected(), 5);
        assert_eq!(report.filtered_total(), 3);
    }

    #[test]
    fn test_changelog_mentions_every_issue() {
        let mut recorder = AuditRecorder::new(2);
        recorder.register(
            "positive_discount",
            "Positive discounts (surcharges recorded as discounts)",
            AuditKind::Filter,
            Table::Transactions,
        );
        for row in 1..=1234 {
            recorder.record("positive_discount", key(row));
        }

        let log = recorder.report().to_changelog();

        assert!(log.starts_with("# Data Quality Log"));
        assert!(log.contains("## Issue 1: Positive discounts (surcharges recorded as discounts)"));
        assert!(log.contains("- **Rows Affected:** 1,234"));
        assert!(log.contains("- **Sample rows:** 1, 2"));
        assert!(log.contains("Excluded from cleaned dataset"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(25000), "25,000");
        assert_eq!(group_thousands(2595732), "2,595,732");
    }
}
