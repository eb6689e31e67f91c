// src/prices.rs
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregator::PriceBook;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price provider returned HTTP {0}")]
    Status(StatusCode),

    #[error("no usable price for {0}")]
    Missing(String),
}

/// One entry of the alpha token list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlphaToken {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chain_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaListResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    #[allow(dead_code)]
    #[serde(default)]
    symbol: String,
    #[serde(deserialize_with = "lenient_price")]
    price: Option<f64>,
}

/// Current price snapshot: the alpha list plus the native asset price.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    pub tokens: Vec<AlphaToken>,
    pub native_price: f64,
}

impl PriceSnapshot {
    /// Symbols on the alpha list, for membership checks over many transfers.
    pub fn listed_symbols(&self) -> HashSet<&str> {
        self.tokens.iter().map(|t| t.symbol.as_str()).collect()
    }

    pub fn book(&self, native_symbol: &str, stable_symbols: impl IntoIterator<Item = String>) -> PriceBook {
        let mut prices: HashMap<String, f64> = self
            .tokens
            .iter()
            .filter_map(|t| t.price.map(|p| (t.symbol.clone(), p)))
            .collect();
        prices.insert(native_symbol.to_string(), self.native_price);
        PriceBook::new(native_symbol, prices, stable_symbols)
    }
}

pub struct PriceClient {
    http: Client,
    alpha_list_url: String,
    native_price_url: String,
}

impl PriceClient {
    pub fn new(cfg: &Config) -> eyre::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            alpha_list_url: cfg.alpha_list_url.clone(),
            native_price_url: cfg.native_price_url.clone(),
        })
    }

    /// Fetch the alpha list and native ticker concurrently.
    pub async fn snapshot(&self, native_symbol: &str) -> Result<PriceSnapshot, PriceError> {
        let (tokens, native_price) =
            futures_util::future::try_join(self.alpha_tokens(), self.native_price(native_symbol)).await?;
        Ok(PriceSnapshot { tokens, native_price })
    }

    pub async fn alpha_tokens(&self) -> Result<Vec<AlphaToken>, PriceError> {
        let resp = self.http.get(&self.alpha_list_url).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(PriceError::Status(resp.status()));
        }
        let body: AlphaListResponse = resp.json().await?;
        let tokens = decode_tokens(body.data);
        debug!("Alpha list: {} tokens", tokens.len());
        Ok(tokens)
    }

    pub async fn native_price(&self, native_symbol: &str) -> Result<f64, PriceError> {
        let resp = self.http.get(&self.native_price_url).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(PriceError::Status(resp.status()));
        }
        let ticker: Ticker = resp.json().await?;
        ticker
            .price
            .ok_or_else(|| PriceError::Missing(native_symbol.to_string()))
    }
}

fn decode_tokens(items: Vec<Value>) -> Vec<AlphaToken> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AlphaToken>(item) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Dropping unreadable alpha list entry: {}", e);
                None
            }
        })
        .collect()
}

/// Parse a decimal price from a JSON string or number.
pub fn parse_price(value: &Value) -> Option<f64> {
    let d = match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok()?,
        _ => return None,
    };
    if d.is_sign_negative() {
        return None;
    }
    d.to_f64()
}

fn lenient_price<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(de)?;
    Ok(parse_price(&v))
}

fn lenient_u32<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() <= b.abs() * 1e-12)
    }

    #[test]
    fn prices_parse_from_strings_and_numbers() {
        assert!(approx(parse_price(&json!("0.2531")), 0.2531));
        assert!(approx(parse_price(&json!(612.5)), 612.5));
        assert!(approx(parse_price(&json!(1.5e-7)), 1.5e-7));
        assert_eq!(parse_price(&json!("")), None);
        assert_eq!(parse_price(&json!("-1")), None);
        assert_eq!(parse_price(&Value::Null), None);
    }

    #[test]
    fn decodes_alpha_list_entries() {
        let items = vec![
            json!({
                "symbol": "ZKJ",
                "name": "Polyhedra Network",
                "price": "1.98",
                "decimals": 18,
                "logo": "https://example.invalid/zkj.png",
                "address": "0xc71b5f631354be6853efe9c3ab6b9590f8302e81",
                "chainId": "56",
                "network": "BSC"
            }),
            json!({ "name": "no symbol" }),
        ];
        let tokens = decode_tokens(items);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "ZKJ");
        assert!(approx(tokens[0].price, 1.98));
        assert_eq!(tokens[0].decimals, Some(18));
        assert_eq!(tokens[0].chain_id.as_deref(), Some("56"));
    }

    #[test]
    fn snapshot_builds_a_book_with_native_price() {
        let snap = PriceSnapshot {
            tokens: vec![AlphaToken {
                symbol: "ZKJ".into(),
                name: String::new(),
                price: Some(2.0),
                decimals: Some(18),
                address: None,
                chain_id: None,
            }],
            native_price: 600.0,
        };
        let book = snap.book("BNB", vec!["USDT".to_string()]);
        assert_eq!(book.resolve("ZKJ"), Some(2.0));
        assert_eq!(book.resolve("BNB"), Some(600.0));
        assert_eq!(book.resolve("USDT"), Some(1.0));
        let listed = snap.listed_symbols();
        assert!(listed.contains("ZKJ"));
        assert!(!listed.contains("USDT"));
    }
}
