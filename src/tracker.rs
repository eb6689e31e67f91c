// src/tracker.rs
//! One wallet lookup: fetch, filter, reconcile, then price everything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::future::try_join4;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregator::{self, AssetPosition, PriceBook};
use crate::config::Config;
use crate::error::SkippedTransaction;
use crate::explorer::{ExplorerClient, ExplorerError};
use crate::models::{ProviderLists, SwapRecord};
use crate::pairer::same_address;
use crate::points::{self, Progress};
use crate::prices::{PriceClient, PriceError, PriceSnapshot};
use crate::reconcile::{self, Reconciliation};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    #[error(transparent)]
    Prices(#[from] PriceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSummary {
    pub points: u32,
    pub next_threshold: f64,
    pub previous_threshold: f64,
    pub progress_percent: f64,
    /// Volume after the multiplier; this is what the points are based on.
    pub effective_volume: f64,
}

impl From<Progress> for PointsSummary {
    fn from(p: Progress) -> Self {
        Self {
            points: p.points,
            next_threshold: p.next_threshold,
            previous_threshold: p.previous_threshold,
            progress_percent: p.progress_percent,
            effective_volume: p.volume,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub assets: BTreeMap<String, AssetPosition>,
    pub ranking: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub start_block: String,
    pub price: BTreeMap<String, f64>,
    pub transactions: Vec<SwapRecord>,
    pub volume: f64,
    pub points: PointsSummary,
    pub portfolio: PortfolioView,
    pub gas_fee_usd: f64,
    pub net_profit_usd: f64,
    pub unresolved_symbols: BTreeSet<String>,
    pub skipped: Vec<SkippedTransaction>,
}

pub struct Tracker {
    explorer: Arc<ExplorerClient>,
    prices: PriceClient,
    cfg: Config,
}

impl Tracker {
    pub fn new(cfg: Config, explorer: Arc<ExplorerClient>) -> eyre::Result<Self> {
        let prices = PriceClient::new(&cfg)?;
        Ok(Self { explorer, prices, cfg })
    }

    pub fn explorer(&self) -> &ExplorerClient {
        &self.explorer
    }

    /// Full lookup for `address` from `start_block` onwards.
    pub async fn calculate(&self, address: &str, start_block: &str) -> Result<CalculateResponse, TrackerError> {
        info!("Calculating {} from block {}", address, start_block);

        let (snapshot, native, internal, token) = try_join4(
            async { Ok::<_, TrackerError>(self.prices.snapshot(&self.cfg.native_symbol).await?) },
            async { Ok::<_, TrackerError>(self.explorer.native_transfers(address, start_block).await?) },
            async { Ok::<_, TrackerError>(self.explorer.internal_transfers(address, start_block).await?) },
            async { Ok::<_, TrackerError>(self.explorer.token_transfers(address, start_block).await?) },
        )
        .await?;

        let dropped = native.dropped + internal.dropped + token.dropped;
        if dropped > 0 {
            warn!("{} explorer entries for {} could not be decoded", dropped, address);
        }

        let lists = ProviderLists {
            native: native.entries,
            internal: internal.entries,
            token: token.entries,
        };

        let response = self.summarize(address, start_block, lists, &snapshot);
        info!(
            "{}: {} records, volume ${:.2}, {} points",
            address,
            response.transactions.len(),
            response.volume,
            response.points.points
        );
        Ok(response)
    }

    /// Everything after the network: filter, reconcile, volume, points, portfolio.
    pub fn summarize(
        &self,
        wallet: &str,
        start_block: &str,
        lists: ProviderLists,
        snapshot: &PriceSnapshot,
    ) -> CalculateResponse {
        let lists = filter_lists(lists, self.cfg.dex_router.as_deref(), snapshot);
        let book = snapshot.book(&self.cfg.native_symbol, self.cfg.stable_symbols.iter().cloned());

        let Reconciliation { records, skipped } = reconcile::reconcile(lists, wallet, &self.cfg.native_symbol);

        let reward = reconcile::reward_volume(&records, &book);
        let progress = points::progress(reward.volume * self.cfg.volume_multiplier);

        let portfolio = aggregator::aggregate(&records, &book);
        let gas_fee_usd = gas_fee_usd(&records, &book);
        let net_profit_usd = portfolio.total_profit() - gas_fee_usd;

        let mut unresolved_symbols = reward.unresolved;
        unresolved_symbols.extend(portfolio.unresolved.iter().cloned());

        CalculateResponse {
            start_block: start_block.to_string(),
            price: book.snapshot(),
            transactions: records,
            volume: reward.volume,
            points: progress.into(),
            portfolio: PortfolioView {
                assets: portfolio.assets,
                ranking: portfolio.ranking,
            },
            gas_fee_usd,
            net_profit_usd,
            unresolved_symbols,
            skipped,
        }
    }
}

/// Native transfers must touch the router (when one is set); token transfers
/// must be on the alpha list. Internal transfers pass through.
pub fn filter_lists(lists: ProviderLists, router: Option<&str>, snapshot: &PriceSnapshot) -> ProviderLists {
    let ProviderLists { native, internal, token } = lists;

    let native = match router {
        Some(router) => native
            .into_iter()
            .filter(|tx| same_address(&tx.from, router) || same_address(&tx.to, router))
            .collect(),
        None => native,
    };
    let listed = snapshot.listed_symbols();
    let token = token
        .into_iter()
        .filter(|tx| listed.contains(tx.token_symbol.as_str()))
        .collect();

    ProviderLists { native, internal, token }
}

/// Σ gas over records, in USD. Zero when the native price is unknown.
pub fn gas_fee_usd(records: &[SwapRecord], prices: &PriceBook) -> f64 {
    let gas: f64 = records.iter().filter_map(|r| r.gas).sum();
    if gas == 0.0 {
        return 0.0;
    }
    match prices.require(prices.native_symbol()) {
        Ok(price) => gas * price,
        Err(e) => {
            warn!("Gas fee left out of profit: {}", e);
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NativeTransfer, TokenTransfer};
    use crate::prices::AlphaToken;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const ROUTER: &str = "0xb300000b72deaeb607a12d5f54773d1c19c7028d";
    const FRIEND: &str = "0x2222222222222222222222222222222222222222";

    fn tracker() -> Tracker {
        let cfg = Config {
            api_keys: vec!["test".into()],
            ..Config::default()
        };
        let explorer = Arc::new(ExplorerClient::new(&cfg).unwrap());
        Tracker::new(cfg, explorer).unwrap()
    }

    fn snapshot() -> PriceSnapshot {
        PriceSnapshot {
            tokens: vec![AlphaToken {
                symbol: "ZKJ".into(),
                name: "Polyhedra Network".into(),
                price: Some(2.0),
                decimals: Some(18),
                address: Some("0xc71b5f631354be6853efe9c3ab6b9590f8302e81".into()),
                chain_id: Some("56".into()),
            }],
            native_price: 600.0,
        }
    }

    fn native(hash: &str, from: &str, to: &str, value: &str) -> NativeTransfer {
        NativeTransfer {
            hash: hash.into(),
            time_stamp: "1718064100".into(),
            from: from.into(),
            to: to.into(),
            value: value.into(),
            gas_used: Some("100000".into()),
            gas_price: Some("1000000000".into()),
            is_error: Some("0".into()),
        }
    }

    fn token(hash: &str, symbol: &str, from: &str, to: &str, value: &str) -> TokenTransfer {
        TokenTransfer {
            hash: hash.into(),
            time_stamp: "1718064100".into(),
            from: from.into(),
            to: to.into(),
            contract_address: "0xc71b5f631354be6853efe9c3ab6b9590f8302e81".into(),
            value: value.into(),
            token_symbol: symbol.into(),
            token_decimal: Some("18".into()),
            gas_used: Some("100000".into()),
            gas_price: Some("1000000000".into()),
        }
    }

    fn lists() -> ProviderLists {
        ProviderLists {
            native: vec![
                native("0xaa", WALLET, ROUTER, "1000000000000000000"),
                // plain transfer to a friend, not a swap
                native("0xbb", WALLET, FRIEND, "5000000000000000000"),
            ],
            internal: vec![],
            token: vec![
                token("0xaa", "ZKJ", ROUTER, WALLET, "100000000000000000000"),
                token("0xcc", "SCAM", FRIEND, WALLET, "1000000000000000000"),
            ],
        }
    }

    #[test]
    fn filters_keep_router_and_alpha_entries() {
        let filtered = filter_lists(lists(), Some(ROUTER), &snapshot());
        assert_eq!(filtered.native.len(), 1);
        assert_eq!(filtered.native[0].hash, "0xaa");
        assert_eq!(filtered.token.len(), 1);
        assert_eq!(filtered.token[0].token_symbol, "ZKJ");

        let unfiltered = filter_lists(lists(), None, &snapshot());
        assert_eq!(unfiltered.native.len(), 2);
    }

    #[test]
    fn token_filter_over_a_long_alpha_list() {
        let mut snap = snapshot();
        let template = snap.tokens[0].clone();
        snap.tokens.extend((0..500).map(|i| AlphaToken {
            symbol: format!("ALPHA{}", i),
            ..template.clone()
        }));

        let mut l = lists();
        l.token.extend((0..500).map(|i| {
            let symbol = if i % 2 == 0 { format!("ALPHA{}", i) } else { format!("JUNK{}", i) };
            token(&format!("0x{:x}", 0x1000 + i), &symbol, ROUTER, WALLET, "1")
        }));

        let filtered = filter_lists(l, None, &snap);
        // ZKJ plus the 250 even ALPHA entries; SCAM and JUNK are gone
        assert_eq!(filtered.token.len(), 251);
        assert!(filtered
            .token
            .iter()
            .all(|tx| tx.token_symbol == "ZKJ" || tx.token_symbol.starts_with("ALPHA")));
    }

    #[test]
    fn summary_of_a_single_buy() {
        let resp = tracker().summarize(WALLET, "39500000", lists(), &snapshot());

        assert_eq!(resp.transactions.len(), 1);
        let rec = &resp.transactions[0];
        assert_eq!(rec.from.symbol, "BNB");
        assert_eq!(rec.to.symbol, "ZKJ");

        // raw volume is reported; points use the default x2
        assert!((resp.volume - 200.0).abs() < 1e-9);
        assert!((resp.points.effective_volume - 400.0).abs() < 1e-9);
        assert_eq!(resp.points.points, 8);
        assert_eq!(resp.points.next_threshold, 512.0);
        assert_eq!(resp.points.previous_threshold, 256.0);
        assert!((resp.points.progress_percent - 56.25).abs() < 1e-9);

        assert!((resp.gas_fee_usd - 0.06).abs() < 1e-9);
        assert!((resp.net_profit_usd - (200.0 - 600.0 - 0.06)).abs() < 1e-9);
        assert_eq!(resp.portfolio.ranking, ["ZKJ", "BNB"]);
        assert!(resp.unresolved_symbols.is_empty());
        assert!(resp.skipped.is_empty());
        assert_eq!(resp.price.get("BNB"), Some(&600.0));
    }

    #[test]
    fn multiplier_changes_points_not_volume() {
        let mut t = tracker();
        t.cfg.volume_multiplier = 1.0;
        let resp = t.summarize(WALLET, "1", lists(), &snapshot());
        assert!((resp.volume - 200.0).abs() < 1e-9);
        assert!((resp.points.effective_volume - 200.0).abs() < 1e-9);
        assert_eq!(resp.points.points, 7);
        assert_eq!(resp.points.next_threshold, 256.0);
    }

    #[test]
    fn malformed_hash_is_reported_not_fatal() {
        let mut l = lists();
        l.token.push(token("0xdd", "ZKJ", ROUTER, WALLET, "12abc"));
        let resp = tracker().summarize(WALLET, "1", l, &snapshot());
        assert_eq!(resp.transactions.len(), 1);
        assert_eq!(resp.skipped.len(), 1);
        assert_eq!(resp.skipped[0].hash, "0xdd");
    }

    #[test]
    fn gas_without_native_price_is_zero() {
        let book = PriceBook::new("BNB", Default::default(), Vec::<String>::new());
        let records = tracker().summarize(WALLET, "1", lists(), &snapshot()).transactions;
        assert_eq!(gas_fee_usd(&records, &book), 0.0);
    }

    #[test]
    fn response_uses_camel_case() {
        let resp = tracker().summarize(WALLET, "1", lists(), &snapshot());
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v.get("gasFeeUsd").is_some());
        assert!(v.get("netProfitUsd").is_some());
        assert!(v["points"].get("progressPercent").is_some());
        assert!(v["portfolio"].get("ranking").is_some());
        assert!(v["portfolio"].get("unresolved").is_none());
    }
}
