// src/explorer.rs
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{InternalTransfer, NativeTransfer, TokenTransfer};
use crate::parser::{self, Parsed};
use crate::throttle::{BreakerStatus, CircuitBreaker, KeyRotator, RateLimiter};

const END_BLOCK: &str = "99999999";
const PAGE_SIZE: &str = "10000";

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("explorer returned HTTP {0}")]
    Status(StatusCode),

    #[error("explorer rejected the request: {0}")]
    Rejected(String),

    #[error("explorer circuit breaker is open, too many recent failures")]
    CircuitOpen,

    #[error("explorer call failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ExplorerError {
    /// Errors not worth another attempt.
    fn is_fatal(&self) -> bool {
        matches!(self, ExplorerError::Status(s) if *s == StatusCode::FORBIDDEN || *s == StatusCode::NOT_FOUND)
    }
}

/// The three account list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Native,
    Internal,
    Token,
}

impl ListAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListAction::Native => "txlist",
            ListAction::Internal => "txlistinternal",
            ListAction::Token => "tokentx",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

/// Exponential backoff: `base * multiplier^attempt`, capped at `max_delay`,
/// then scaled by a random factor in 0.5..=1.0.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// `delay(attempt)` with jitter applied.
    pub fn jittered(&self, attempt: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        self.delay(attempt).mul_f64(factor)
    }
}

/// Accept a list response: `status == "1"`, or `"0"` with the explorer's
/// "no transactions" message (an empty list).
pub fn accept_list(resp: ExplorerResponse) -> Result<Value, ExplorerError> {
    if resp.status == "1" && resp.result.is_array() {
        return Ok(resp.result);
    }
    if resp.status == "0" && resp.message.starts_with("No transactions found") {
        return Ok(Value::Array(Vec::new()));
    }
    Err(rejected(&resp))
}

/// Accept a block lookup response carrying a decimal block number.
pub fn accept_block(resp: ExplorerResponse) -> Result<u64, ExplorerError> {
    if resp.status == "1" {
        if let Some(n) = resp.result.as_str().and_then(|s| s.trim().parse().ok()) {
            return Ok(n);
        }
    }
    Err(rejected(&resp))
}

fn rejected(resp: &ExplorerResponse) -> ExplorerError {
    let detail = match &resp.result {
        Value::String(s) => s.clone(),
        Value::Array(a) => format!("{} items", a.len()),
        other => other.to_string(),
    };
    ExplorerError::Rejected(format!(
        "status={}, message={}, result={}",
        resp.status, resp.message, detail
    ))
}

/// Block explorer client (etherscan v2 style API).
pub struct ExplorerClient {
    http: Client,
    base_url: String,
    chain_id: u64,
    keys: KeyRotator,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ExplorerClient {
    pub fn new(cfg: &Config) -> eyre::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        let keys = KeyRotator::new(cfg.api_keys.iter().cloned())?;
        info!(
            "Explorer client → {} (chain {}, {} keys, {} rps)",
            cfg.explorer_url,
            cfg.chain_id,
            keys.len(),
            cfg.requests_per_second
        );

        Ok(Self::with_parts(
            http,
            cfg.explorer_url.clone(),
            cfg.chain_id,
            keys,
            RateLimiter::per_second(cfg.requests_per_second),
            CircuitBreaker::new(5, Duration::from_secs(60)),
            RetryPolicy {
                max_retries: cfg.max_retries,
                ..RetryPolicy::default()
            },
        ))
    }

    pub fn with_parts(
        http: Client,
        base_url: String,
        chain_id: u64,
        keys: KeyRotator,
        limiter: RateLimiter,
        breaker: CircuitBreaker,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            chain_id,
            keys,
            limiter,
            breaker,
            retry,
        }
    }

    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.status()
    }

    pub async fn native_transfers(&self, address: &str, start_block: &str) -> Result<Parsed<NativeTransfer>, ExplorerError> {
        let result = self.account_list(ListAction::Native, address, start_block).await?;
        Ok(parser::decode_native(result).unwrap_or_else(empty))
    }

    pub async fn internal_transfers(&self, address: &str, start_block: &str) -> Result<Parsed<InternalTransfer>, ExplorerError> {
        let result = self.account_list(ListAction::Internal, address, start_block).await?;
        Ok(parser::decode_internal(result).unwrap_or_else(empty))
    }

    pub async fn token_transfers(&self, address: &str, start_block: &str) -> Result<Parsed<TokenTransfer>, ExplorerError> {
        let result = self.account_list(ListAction::Token, address, start_block).await?;
        Ok(parser::decode_token(result).unwrap_or_else(empty))
    }

    /// Raw `result` array of one account list endpoint.
    pub async fn account_list(&self, action: ListAction, address: &str, start_block: &str) -> Result<Value, ExplorerError> {
        let params = vec![
            ("module", "account".to_string()),
            ("action", action.as_str().to_string()),
            ("address", address.to_string()),
            ("startblock", start_block.to_string()),
            ("endblock", END_BLOCK.to_string()),
            ("page", "1".to_string()),
            ("offset", PAGE_SIZE.to_string()),
            ("sort", "desc".to_string()),
        ];
        debug!("📡 {} for {} from block {}", action.as_str(), address, start_block);
        self.call(&params, self.retry.max_retries, accept_list).await
    }

    /// Last block at or before `timestamp` (unix seconds).
    pub async fn block_by_time(&self, timestamp: i64) -> Result<u64, ExplorerError> {
        let params = vec![
            ("module", "block".to_string()),
            ("action", "getblocknobytime".to_string()),
            ("timestamp", timestamp.to_string()),
            ("closest", "before".to_string()),
        ];
        debug!("📡 getblocknobytime for {}", timestamp);
        self.call(&params, self.retry.max_retries.min(3), accept_block).await
    }

    async fn call<T>(
        &self,
        params: &[(&'static str, String)],
        max_retries: u32,
        accept: fn(ExplorerResponse) -> Result<T, ExplorerError>,
    ) -> Result<T, ExplorerError> {
        if self.breaker.is_open() {
            return Err(ExplorerError::CircuitOpen);
        }

        let mut last: Option<ExplorerError> = None;
        let mut attempts = 0;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = self.retry.jittered(attempt - 1);
                debug!("Explorer retry {} after {:?}", attempt, delay);
                sleep(delay).await;
            }
            attempts += 1;

            match self.attempt(params).await.and_then(accept) {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(e) => {
                    warn!("⚠️ Explorer call failed (attempt {}): {}", attempt + 1, e);
                    let fatal = e.is_fatal();
                    last = Some(e);
                    if fatal {
                        break;
                    }
                }
            }
        }

        self.breaker.record_failure();
        Err(ExplorerError::Exhausted {
            attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(&self, params: &[(&'static str, String)]) -> Result<ExplorerResponse, ExplorerError> {
        self.limiter.acquire().await;

        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("chainid", self.chain_id.to_string())])
            .query(params)
            .query(&[("apikey", self.keys.next_key())])
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(ExplorerError::Status(resp.status()));
        }

        Ok(resp.json::<ExplorerResponse>().await?)
    }
}

fn empty<T>() -> Parsed<T> {
    Parsed {
        entries: Vec::new(),
        dropped: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(v: Value) -> ExplorerResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn list_success() {
        let r = response(json!({"status": "1", "message": "OK", "result": [{"hash": "0x1"}]}));
        assert_eq!(accept_list(r).unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn no_transactions_is_an_empty_list() {
        let r = response(json!({"status": "0", "message": "No transactions found", "result": []}));
        assert_eq!(accept_list(r).unwrap(), json!([]));
    }

    #[test]
    fn rate_limit_message_is_rejected() {
        let r = response(json!({"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}));
        let err = accept_list(r).unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn block_lookup() {
        let ok = response(json!({"status": "1", "message": "OK", "result": "51234567"}));
        assert_eq!(accept_block(ok).unwrap(), 51_234_567);

        let bad = response(json!({"status": "1", "message": "OK", "result": "soon"}));
        assert!(accept_block(bad).is_err());
    }

    #[test]
    fn backoff_grows_then_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(0), Duration::from_millis(1000));
        assert_eq!(p.delay(1), Duration::from_millis(2000));
        assert_eq!(p.delay(3), Duration::from_millis(8000));
        assert_eq!(p.delay(4), Duration::from_millis(10_000));
        assert_eq!(p.delay(40), Duration::from_millis(10_000));
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        let p = RetryPolicy::default();
        for attempt in 0..6 {
            let full = p.delay(attempt);
            for _ in 0..50 {
                let d = p.jittered(attempt);
                assert!(d >= full / 2 && d <= full, "attempt {attempt}: {d:?} vs {full:?}");
            }
        }
    }

    #[test]
    fn forbidden_is_not_retried() {
        assert!(ExplorerError::Status(StatusCode::FORBIDDEN).is_fatal());
        assert!(ExplorerError::Status(StatusCode::NOT_FOUND).is_fatal());
        assert!(!ExplorerError::Status(StatusCode::BAD_GATEWAY).is_fatal());
    }

    #[test]
    fn action_names() {
        assert_eq!(ListAction::Native.as_str(), "txlist");
        assert_eq!(ListAction::Internal.as_str(), "txlistinternal");
        assert_eq!(ListAction::Token.as_str(), "tokentx");
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_without_network() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        let client = ExplorerClient::with_parts(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            56,
            KeyRotator::new(["k"]).unwrap(),
            RateLimiter::with_interval(Duration::ZERO),
            breaker,
            RetryPolicy::default(),
        );
        let err = client.block_by_time(0).await.unwrap_err();
        assert!(matches!(err, ExplorerError::CircuitOpen));
    }
}
