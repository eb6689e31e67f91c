// src/aggregator.rs
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::models::SwapRecord;

/// Symbol → USD price snapshot with the fallbacks used when a symbol is
/// missing from the provider list.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    native_symbol: String,
    prices: HashMap<String, f64>,
    stable: HashSet<String>,
}

impl PriceBook {
    pub fn new<S: Into<String>>(
        native_symbol: impl Into<String>,
        prices: HashMap<String, f64>,
        stable_symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            native_symbol: native_symbol.into(),
            prices,
            stable: stable_symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    pub fn native_price(&self) -> Option<f64> {
        self.resolve(&self.native_symbol)
    }

    /// Listed price first; USD-pegged symbols fall back to 1.0.
    pub fn resolve(&self, symbol: &str) -> Option<f64> {
        match self.prices.get(symbol) {
            Some(p) if p.is_finite() => Some(*p),
            _ if self.stable.contains(symbol) => Some(1.0),
            _ => None,
        }
    }

    pub fn require(&self, symbol: &str) -> Result<f64, ReconcileError> {
        self.resolve(symbol)
            .ok_or_else(|| ReconcileError::UnresolvedPrice(symbol.to_string()))
    }

    /// Prices as echoed back to clients, stable fallbacks included.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = self
            .stable
            .iter()
            .map(|s| (s.clone(), 1.0))
            .collect();
        out.extend(self.prices.iter().filter(|(_, p)| p.is_finite()).map(|(s, p)| (s.clone(), *p)));
        out
    }
}

/// Per-asset totals for the tracked wallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetPosition {
    pub incoming: f64,
    pub outgoing: f64,
    pub address: String,
    pub profit: f64,
}

impl AssetPosition {
    pub fn net(&self) -> f64 {
        self.incoming - self.outgoing
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Portfolio {
    pub assets: BTreeMap<String, AssetPosition>,
    /// Winners by profit, then the rest by size of loss.
    pub ranking: Vec<String>,
    /// Symbols that had no price; their legs add nothing to profit.
    #[serde(skip)]
    pub unresolved: BTreeSet<String>,
}

impl Portfolio {
    pub fn total_profit(&self) -> f64 {
        self.assets.values().map(|a| a.profit).sum()
    }
}

/// Fold every record into per-symbol incoming / outgoing / profit buckets.
pub fn aggregate(records: &[SwapRecord], prices: &PriceBook) -> Portfolio {
    let mut assets: BTreeMap<String, AssetPosition> = BTreeMap::new();
    let mut unresolved = BTreeSet::new();

    let mut price_of = |symbol: &str| -> f64 {
        prices.resolve(symbol).unwrap_or_else(|| {
            unresolved.insert(symbol.to_string());
            0.0
        })
    };

    for record in records {
        let to_price = price_of(&record.to.symbol);
        let to = assets.entry(record.to.symbol.clone()).or_default();
        to.incoming += record.to.value;
        to.profit += record.to.value * to_price;
        if to.address.is_empty() {
            to.address = record.to.contract_address.clone();
        }

        let from_price = price_of(&record.from.symbol);
        let from = assets.entry(record.from.symbol.clone()).or_default();
        from.outgoing += record.from.value;
        from.profit -= record.from.value * from_price;
        if from.address.is_empty() {
            from.address = record.from.contract_address.clone();
        }
    }

    if !unresolved.is_empty() {
        warn!("No USD price for {:?}; their legs count as zero profit", unresolved);
    }

    let ranking = rank(&assets);
    debug!("Aggregated {} records into {} assets", records.len(), assets.len());

    Portfolio {
        assets,
        ranking,
        unresolved,
    }
}

/// Positive profit first (largest first), then non-positive by descending
/// magnitude. Ties keep symbol order.
pub fn rank(assets: &BTreeMap<String, AssetPosition>) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = assets.iter().map(|(s, a)| (s, a.profit)).collect();
    ranked.sort_by(|(_, a), (_, b)| match (*a > 0.0, *b > 0.0) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => b.total_cmp(a),
        (false, false) => b.abs().total_cmp(&a.abs()),
    });
    ranked.into_iter().map(|(s, _)| s.clone()).collect()
}
