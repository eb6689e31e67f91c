// src/parser.rs
//! Explorer `result` arrays → typed raw entries.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::models::{InternalTransfer, NativeTransfer, TokenTransfer};

/// Typed entries plus how many elements had to be dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub entries: Vec<T>,
    pub dropped: usize,
}

/// Decode every element of an explorer result array as `T`.
///
/// Elements missing required fields are dropped with a warning; a result that
/// is not an array at all yields `None`.
pub fn decode_list<T: DeserializeOwned>(kind: &str, result: Value) -> Option<Parsed<T>> {
    let Value::Array(items) = result else {
        return None;
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                dropped += 1;
                warn!("Dropping unreadable {} entry: {}", kind, e);
            }
        }
    }

    Some(Parsed { entries, dropped })
}

pub fn decode_native(result: Value) -> Option<Parsed<NativeTransfer>> {
    decode_list("txlist", result)
}

pub fn decode_internal(result: Value) -> Option<Parsed<InternalTransfer>> {
    decode_list("txlistinternal", result)
}

pub fn decode_token(result: Value) -> Option<Parsed<TokenTransfer>> {
    decode_list("tokentx", result)
}
