// ⚠️ Error Types - Parse and configuration failures
// The only two ways a run can fail; rule evaluation itself is total.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// TABLES
// ============================================================================

/// Which input table a malformed row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Transactions,
    Demographics,
    Products,
    Campaigns,
    Redemptions,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Transactions => write!(f, "transactions"),
            Table::Demographics => write!(f, "demographics"),
            Table::Products => write!(f, "products"),
            Table::Campaigns => write!(f, "campaigns"),
            Table::Redemptions => write!(f, "redemptions"),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// A raw row that could not be coerced into its typed record
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{table} row {row}: field `{field}` {reason}")]
pub struct ParseError {
    pub table: Table,
    /// 1-based position of the row in its input stream
    pub row: usize,
    pub field: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(table: Table, row: usize, field: &str, reason: impl Into<String>) -> Self {
        ParseError {
            table,
            row,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(table: Table, row: usize, field: &str) -> Self {
        ParseError::new(table, row, field, "is missing")
    }
}

/// Invalid threshold or option, surfaced before any row is processed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid configuration `{setting}`: {reason}")]
pub struct ConfigurationError {
    pub setting: String,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(setting: &str, reason: impl Into<String>) -> Self {
        ConfigurationError {
            setting: setting.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("parse failure: {0}")]
    Parse(#[from] ParseError),

    #[error("configuration failure: {0}")]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
