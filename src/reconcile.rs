// src/reconcile.rs
//! Raw explorer lists → canonical swap records for one wallet.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::PriceBook;
use crate::error::SkippedTransaction;
use crate::grouper;
use crate::models::{ProviderLists, SwapRecord};
use crate::movements;
use crate::pairer;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    /// Newest first.
    pub records: Vec<SwapRecord>,
    pub skipped: Vec<SkippedTransaction>,
}

/// Group, expand and pair the provider lists for `wallet`.
///
/// A hash with any unreadable entry is left out entirely and reported in
/// `skipped`; everything else still comes through.
pub fn reconcile(lists: ProviderLists, wallet: &str, native_symbol: &str) -> Reconciliation {
    if lists.is_empty() {
        return Reconciliation::default();
    }

    let groups = grouper::group_by_hash(lists);
    debug!("Reconciling {} transaction hashes for {}", groups.len(), wallet);

    let mut out = Reconciliation::default();

    for group in &groups {
        match movements::extract(group, native_symbol) {
            Ok(moves) if moves.is_empty() => {}
            Ok(moves) => out.records.extend(pairer::pair_movements(moves, wallet)),
            Err(e) => {
                warn!("Skipping transaction {}: {}", group.hash, e);
                out.skipped.push(SkippedTransaction::new(&group.hash, &e));
            }
        }
    }

    pairer::sort_newest_first(&mut out.records);
    out
}

/// USD volume that counts toward points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RewardVolume {
    pub volume: f64,
    pub unresolved: BTreeSet<String>,
}

/// Σ `to.value × price[to.symbol]`, skipping records that land in the native
/// asset. Every record counts, so multi-leg swaps count once per leg pair.
pub fn reward_volume(records: &[SwapRecord], prices: &PriceBook) -> RewardVolume {
    let mut out = RewardVolume::default();
    for record in records {
        if record.to.symbol == prices.native_symbol() {
            continue;
        }
        match prices.resolve(&record.to.symbol) {
            Some(price) => out.volume += record.to.value * price,
            None => {
                out.unresolved.insert(record.to.symbol.clone());
            }
        }
    }
    out
}
