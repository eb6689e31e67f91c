use dotenvy::dotenv;
use eyre::Result;
use std::{collections::HashSet, env};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_ALPHA_LIST_URL: &str =
    "https://www.binance.com/bapi/defi/v1/public/wallet-direct/buw/wallet/cex/alpha/all/token/list";
pub const DEFAULT_NATIVE_PRICE_URL: &str =
    "https://api.binance.com/api/v3/ticker/price?symbol=BNBUSDT";
pub const DEFAULT_DEX_ROUTER: &str = "0xb300000b72deaeb607a12d5f54773d1c19c7028d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub bind_all: bool,
    pub db_path: String,
    pub explorer_url: String,
    pub chain_id: u64,
    pub api_keys: Vec<String>,
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub alpha_list_url: String,
    pub native_price_url: String,
    pub native_symbol: String,
    pub dex_router: Option<String>,
    pub stable_symbols: HashSet<String>,
    pub volume_multiplier: f64,
}

// keys stay out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_all", &self.bind_all)
            .field("db_path", &self.db_path)
            .field("explorer_url", &self.explorer_url)
            .field("chain_id", &self.chain_id)
            .field("api_keys", &format_args!("[{} keys]", self.api_keys.len()))
            .field("requests_per_second", &self.requests_per_second)
            .field("max_retries", &self.max_retries)
            .field("alpha_list_url", &self.alpha_list_url)
            .field("native_price_url", &self.native_price_url)
            .field("native_symbol", &self.native_symbol)
            .field("dex_router", &self.dex_router)
            .field("stable_symbols", &self.stable_symbols)
            .field("volume_multiplier", &self.volume_multiplier)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_all: false,
            db_path: "alpha_tracker.db".to_string(),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            chain_id: 56,
            api_keys: Vec::new(),
            requests_per_second: 5,
            max_retries: 4,
            alpha_list_url: DEFAULT_ALPHA_LIST_URL.to_string(),
            native_price_url: DEFAULT_NATIVE_PRICE_URL.to_string(),
            native_symbol: "BNB".to_string(),
            dex_router: Some(DEFAULT_DEX_ROUTER.to_string()),
            stable_symbols: split_list("USDT,USDC,BUSD,FDUSD,DAI"),
            volume_multiplier: 2.0,
        }
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // .env is optional

    let defaults = Config::default();

    let port = parse_var("PORT", defaults.port)?;
    let bind_all = env::var("BIND_ALL").map(|v| v == "true" || v == "1").unwrap_or(false);
    let db_path = env::var("DATABASE_URL").unwrap_or(defaults.db_path);

    let explorer_url = env::var("EXPLORER_API_URL").unwrap_or(defaults.explorer_url);
    let chain_id = parse_var("CHAIN_ID", defaults.chain_id)?;

    // primary + numbered keys, or one comma separated list
    let mut api_keys: Vec<String> = ["ETHERSCAN_API_KEY", "ETHERSCAN_API_KEY_2", "ETHERSCAN_API_KEY_3"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .collect();
    if let Ok(list) = env::var("ETHERSCAN_API_KEYS") {
        api_keys.extend(split_list::<Vec<String>>(&list));
    }
    api_keys.retain(|k| !k.trim().is_empty());

    let requests_per_second = parse_var("REQUESTS_PER_SECOND", defaults.requests_per_second)?;
    let max_retries = parse_var("EXPLORER_MAX_RETRIES", defaults.max_retries)?;

    let alpha_list_url = env::var("ALPHA_LIST_URL").unwrap_or(defaults.alpha_list_url);
    let native_price_url = env::var("NATIVE_PRICE_URL").unwrap_or(defaults.native_price_url);
    let native_symbol = env::var("NATIVE_SYMBOL").unwrap_or(defaults.native_symbol);

    // empty string turns the router filter off
    let dex_router = match env::var("DEX_ROUTER_ADDRESS") {
        Ok(v) if v.trim().is_empty() => None,
        Ok(v) => Some(v.trim().to_lowercase()),
        Err(_) => defaults.dex_router,
    };

    let stable_symbols = env::var("STABLE_SYMBOLS")
        .map(|v| split_list(&v))
        .unwrap_or(defaults.stable_symbols);

    let volume_multiplier = parse_var("VOLUME_MULTIPLIER", defaults.volume_multiplier)?;

    if !(volume_multiplier.is_finite() && volume_multiplier > 0.0) {
        return Err(ConfigError::Invalid {
            name: "VOLUME_MULTIPLIER",
            value: volume_multiplier.to_string(),
        }
        .into());
    }

    let cfg = Config {
        port,
        bind_all,
        db_path,
        explorer_url,
        chain_id,
        api_keys,
        requests_per_second,
        max_retries,
        alpha_list_url,
        native_price_url,
        native_symbol,
        dex_router,
        stable_symbols,
        volume_multiplier,
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

/// Unset falls back to `default`; set but unparsable is an error.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => parse_value(name, &v),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn split_list<C: FromIterator<String>>(raw: &str) -> C {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
