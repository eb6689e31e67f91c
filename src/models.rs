// src/models.rs
use serde::{Deserialize, Serialize};

/// Zero address used as the contract address of the native asset.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ---------- raw explorer entries ----------

/// Top-level native transfer (`txlist`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    pub hash: String,
    pub time_stamp: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub is_error: Option<String>,
}

/// Native value moved by a contract-internal call (`txlistinternal`).
/// Carries no gas price; fees come from the top-level call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalTransfer {
    pub hash: String,
    pub time_stamp: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub is_error: Option<String>,
}

/// Token transfer (`tokentx`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub hash: String,
    pub time_stamp: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub contract_address: String,
    pub value: String,
    pub token_symbol: String,
    #[serde(default)]
    pub token_decimal: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
}

/// Borrowed, tagged view over one raw entry of any kind.
#[derive(Debug, Clone, Copy)]
pub enum RawEntry<'a> {
    Native(&'a NativeTransfer),
    Internal(&'a InternalTransfer),
    Token(&'a TokenTransfer),
}

impl<'a> RawEntry<'a> {
    pub fn hash(&self) -> &'a str {
        match self {
            RawEntry::Native(tx) => &tx.hash,
            RawEntry::Internal(tx) => &tx.hash,
            RawEntry::Token(tx) => &tx.hash,
        }
    }

    pub fn time_stamp(&self) -> &'a str {
        match self {
            RawEntry::Native(tx) => &tx.time_stamp,
            RawEntry::Internal(tx) => &tx.time_stamp,
            RawEntry::Token(tx) => &tx.time_stamp,
        }
    }

    /// Only native and internal entries report an error flag.
    pub fn failed(&self) -> bool {
        let flag = match self {
            RawEntry::Native(tx) => tx.is_error.as_deref(),
            RawEntry::Internal(tx) => tx.is_error.as_deref(),
            RawEntry::Token(_) => None,
        };
        flag.map(str::trim) == Some("1")
    }
}

/// The three provider lists for one wallet, already typed.
#[derive(Debug, Clone, Default)]
pub struct ProviderLists {
    pub native: Vec<NativeTransfer>,
    pub internal: Vec<InternalTransfer>,
    pub token: Vec<TokenTransfer>,
}

impl ProviderLists {
    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.internal.is_empty() && self.token.is_empty()
    }
}

// ---------- derived values ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Native,
    Token,
}

/// One directional asset transfer derived from a single raw entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub hash: String,
    pub timestamp: u64,
    /// Fee in native units, shared by every movement of the hash.
    pub gas: Option<f64>,
    pub status: TxStatus,
    pub from_address: String,
    pub contract_address: String,
    pub to_address: String,
    pub symbol: String,
    pub decimals: u32,
    pub value: f64,
    pub kind: AssetKind,
}

/// One side of a swap record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub address: String,
    /// Contract of the asset moved on this leg; the zero address for native.
    #[serde(rename = "contractAddress", default)]
    pub contract_address: String,
    pub symbol: String,
    pub decimals: u32,
    pub value: f64,
}

/// Canonical from/to record produced for the tracked wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub hash: String,
    pub timestamp: u64,
    /// Fee in native units; `None` when the explorer gave no gas data.
    pub gas: Option<f64>,
    pub status: TxStatus,
    pub from: Leg,
    pub to: Leg,
}
