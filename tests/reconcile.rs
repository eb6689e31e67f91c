use std::collections::HashMap;

use alpha_tracker::models::{ProviderLists, TxStatus};
use alpha_tracker::{aggregate, calculate_points, parser, points, reconcile, reward_volume, PriceBook};
use serde_json::{json, Value};

const WALLET: &str = "0x3c7a8f1e2d9b4a6c5e0f1a2b3c4d5e6f7a8b9c0d";
const ROUTER: &str = "0xb300000b72deaeb607a12d5f54773d1c19c7028d";
const ZKJ: &str = "0xc71b5f631354be6853efe9c3ab6b9590f8302e81";

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn native_fixture() -> Value {
    json!([
        {
            "blockNumber": "39500120",
            "timeStamp": "1718064200",
            "hash": "0xaaa",
            "from": WALLET,
            "to": ROUTER,
            "value": "500000000000000000",
            "gas": "300000",
            "gasPrice": "3000000000",
            "gasUsed": "150000",
            "isError": "0",
            "txreceipt_status": "1"
        },
        {
            "blockNumber": "39500190",
            "timeStamp": "1718064400",
            "hash": "0xccc",
            "from": WALLET,
            "to": ROUTER,
            "value": "100000000000000000",
            "gasPrice": "1000000000",
            "gasUsed": "21000",
            "isError": "1"
        }
    ])
}

fn internal_fixture() -> Value {
    json!([
        {
            "blockNumber": "39500150",
            "timeStamp": "1718064301",
            "hash": "0xbbb",
            "from": ROUTER,
            "to": WALLET,
            "value": "260000000000000000",
            "gasUsed": "0",
            "isError": "0"
        }
    ])
}

fn token_fixture() -> Value {
    json!([
        {
            "timeStamp": "1718064200",
            "hash": "0xaaa",
            "from": ROUTER,
            "to": WALLET,
            "contractAddress": ZKJ,
            "value": "120000000000000000000",
            "tokenName": "Polyhedra Network",
            "tokenSymbol": "ZKJ",
            "tokenDecimal": "18",
            "gasPrice": "3000000000",
            "gasUsed": "150000"
        },
        {
            "timeStamp": "1718064300",
            "hash": "0xBBB",
            "from": WALLET,
            "to": ROUTER,
            "contractAddress": ZKJ,
            "value": "60000000000000000000",
            "tokenSymbol": "ZKJ",
            "tokenDecimal": "18",
            "gasPrice": "1000000000",
            "gasUsed": "120000"
        },
        {
            "timeStamp": "1718064500",
            "hash": "0xddd",
            "from": WALLET,
            "to": ROUTER,
            "contractAddress": ZKJ,
            "value": "1e18",
            "tokenSymbol": "ZKJ",
            "tokenDecimal": "18"
        },
        // missing hash: dropped at the parser
        { "timeStamp": "1718064600", "from": WALLET, "value": "1" }
    ])
}

fn lists() -> ProviderLists {
    let native = parser::decode_native(native_fixture()).unwrap();
    let internal = parser::decode_internal(internal_fixture()).unwrap();
    let token = parser::decode_token(token_fixture()).unwrap();
    assert_eq!(token.dropped, 1);

    ProviderLists {
        native: native.entries,
        internal: internal.entries,
        token: token.entries,
    }
}

fn book() -> PriceBook {
    let prices = HashMap::from([("BNB".to_string(), 600.0), ("ZKJ".to_string(), 2.0)]);
    PriceBook::new("BNB", prices, ["USDT"])
}

#[test]
fn explorer_lists_to_records() {
    let result = reconcile(lists(), WALLET, "BNB");

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].hash, "0xddd");

    let hashes: Vec<&str> = result.records.iter().map(|r| r.hash.as_str()).collect();
    assert_eq!(hashes, ["0xccc", "0xbbb", "0xaaa"]);

    // failed send, no counterpart
    let failed = &result.records[0];
    assert_eq!(failed.status, TxStatus::Fail);
    assert_eq!(failed.from.symbol, "BNB");
    assert!(close(failed.from.value, 0.1));
    assert_eq!(failed.to.address, ROUTER);
    assert!(close(failed.gas.unwrap(), 0.000021));

    // sell: token out, internal native back, earliest timestamp wins
    let sell = &result.records[1];
    assert_eq!(sell.timestamp, 1_718_064_300);
    assert_eq!((sell.from.symbol.as_str(), sell.to.symbol.as_str()), ("ZKJ", "BNB"));
    assert!(close(sell.from.value, 60.0));
    assert!(close(sell.to.value, 0.26));
    assert!(close(sell.gas.unwrap(), 0.00012));

    // buy
    let buy = &result.records[2];
    assert_eq!((buy.from.symbol.as_str(), buy.to.symbol.as_str()), ("BNB", "ZKJ"));
    assert_eq!(buy.to.address, ZKJ);
    assert!(close(buy.to.value, 120.0));
    assert!(close(buy.gas.unwrap(), 0.00045));
    assert_eq!(buy.status, TxStatus::Success);
}

#[test]
fn records_to_volume_points_and_portfolio() {
    let records = reconcile(lists(), WALLET, "BNB").records;
    let prices = book();

    // only the buy lands in a non-native asset
    let reward = reward_volume(&records, &prices);
    assert!(close(reward.volume, 240.0));
    assert!(reward.unresolved.is_empty());

    assert_eq!(calculate_points(reward.volume), 7);
    let p = points::progress(reward.volume);
    assert_eq!(p.next_threshold, 256.0);
    assert!(p.progress_percent > 80.0 && p.progress_percent < 90.0);

    let portfolio = aggregate(&records, &prices);
    let bnb = &portfolio.assets["BNB"];
    assert!(close(bnb.outgoing, 0.6));
    assert!(close(bnb.incoming, 0.26));
    assert!(close(bnb.profit, -204.0));

    let zkj = &portfolio.assets["ZKJ"];
    assert!(close(zkj.net(), 60.0));
    assert!(close(zkj.profit, 120.0));

    assert_eq!(portfolio.ranking, ["ZKJ", "BNB"]);
    assert!(close(portfolio.total_profit(), -84.0));
}

#[test]
fn wallet_case_does_not_matter() {
    let lower = reconcile(lists(), WALLET, "BNB").records;
    let upper = reconcile(lists(), &WALLET.to_uppercase().replacen("0X", "0x", 1), "BNB").records;

    let shape = |records: &[alpha_tracker::SwapRecord]| -> Vec<(String, String, String)> {
        records
            .iter()
            .map(|r| (r.hash.clone(), r.from.symbol.clone(), r.to.symbol.clone()))
            .collect()
    };
    assert_eq!(shape(&lower), shape(&upper));
}

#[test]
fn nothing_in_nothing_out() {
    let result = reconcile(ProviderLists::default(), WALLET, "BNB");
    assert!(result.records.is_empty());
    assert!(result.skipped.is_empty());
    assert_eq!(reward_volume(&result.records, &book()).volume, 0.0);
    assert_eq!(calculate_points(0.0), 0);
}

#[test]
fn later_plain_receive_keeps_the_contract_as_asset_address() {
    let friend = "0x9999999999999999999999999999999999999999";
    let mut lists = lists();
    lists.token.extend(
        parser::decode_token(json!([{
            "timeStamp": "1718070000",
            "hash": "0xeee",
            "from": friend,
            "to": WALLET,
            "contractAddress": ZKJ,
            "value": "5000000000000000000",
            "tokenSymbol": "ZKJ",
            "tokenDecimal": "18"
        }]))
        .unwrap()
        .entries,
    );

    let records = reconcile(lists, WALLET, "BNB").records;
    assert_eq!(records[0].hash, "0xeee");
    assert_eq!(records[0].to.address, WALLET);
    assert_eq!(records[0].to.contract_address, ZKJ);

    let portfolio = aggregate(&records, &book());
    assert_eq!(portfolio.assets["ZKJ"].address, ZKJ);
    assert_eq!(portfolio.assets["BNB"].address, "0x0000000000000000000000000000000000000000");
}
