// src/error.rs
use serde::Serialize;
use thiserror::Error;

/// Failures raised while turning raw explorer entries into swap records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("malformed amount in `{field}`: {value:?}")]
    MalformedAmount { field: &'static str, value: String },

    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("no USD price for symbol {0}")]
    UnresolvedPrice(String),
}

impl ReconcileError {
    pub fn amount(field: &'static str, value: &str) -> Self {
        Self::MalformedAmount {
            field,
            value: value.to_string(),
        }
    }
}

/// A transaction hash left out of the result because one of its entries
/// could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTransaction {
    pub hash: String,
    pub reason: String,
}

impl SkippedTransaction {
    pub fn new(hash: &str, err: &ReconcileError) -> Self {
        Self {
            hash: hash.to_string(),
            reason: err.to_string(),
        }
    }
}
