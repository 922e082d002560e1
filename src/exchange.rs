//! Delta Exchange public REST client
//!
//! Thin blocking wrappers around the products, tickers and candles
//! endpoints. No API key is needed. Every response must be a JSON object
//! with a `result` list; anything else is reported as a [`FetchError`].

use anyhow::bail;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::types::{Candle, Product, Ticker};

const PRODUCTS_PATH: &str = "/v2/products";
const TICKERS_PATH: &str = "/v2/tickers";
const CANDLES_PATH: &str = "/v2/history/candles";

const NO_PARAMS: &[(&str, &str)] = &[];

/// Parameters of one candles request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandleQuery {
    pub symbol: String,
    pub resolution: String,
    /// Window start, unix seconds
    pub start: i64,
    /// Window end, unix seconds
    pub end: i64,
    pub limit: u32,
}

/// Blocking client for the Delta Exchange public API
#[derive(Debug, Clone)]
pub struct DeltaClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl DeltaClient {
    /// Create a client for the configured base URL and timeout
    pub fn new(config: &Config) -> FetchResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(DeltaClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All listed products
    pub fn get_products(&self) -> FetchResult<Vec<Product>> {
        self.get_list(PRODUCTS_PATH, NO_PARAMS)
    }

    /// Ticker snapshots for all products
    pub fn get_tickers(&self) -> FetchResult<Vec<Ticker>> {
        self.get_list(TICKERS_PATH, NO_PARAMS)
    }

    /// One page of candles
    pub fn get_candles(&self, query: &CandleQuery) -> FetchResult<Vec<Candle>> {
        self.get_list(CANDLES_PATH, query)
    }

    fn get_list<T, Q>(&self, path: &str, query: &Q) -> FetchResult<Vec<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(FetchError::status(status, &body));
        }

        parse_result_list(&body)
    }
}

/// Extract and decode the `result` list of a response body
pub fn parse_result_list<T: DeserializeOwned>(body: &str) -> FetchResult<Vec<T>> {
    let mut json: Value = serde_json::from_str(body).map_err(FetchError::InvalidJson)?;

    match json.get_mut("result").map(Value::take) {
        Some(result @ Value::Array(_)) => serde_json::from_value(result).map_err(FetchError::Decode),
        _ => Err(FetchError::missing_result(body)),
    }
}

/// Fetch all products, logging any failure and returning an empty list
pub fn fetch_products(client: &DeltaClient) -> Vec<Product> {
    info!("Fetching all products from: {}{}...", client.base_url(), PRODUCTS_PATH);
    match client.get_products() {
        Ok(products) => {
            info!("Successfully fetched {} products.", products.len());
            products
        }
        Err(e) => {
            log_failure("products", &e);
            Vec::new()
        }
    }
}

/// Fetch all tickers, logging any failure and returning an empty list
pub fn fetch_tickers(client: &DeltaClient) -> Vec<Ticker> {
    info!("Fetching all tickers from: {}{}...", client.base_url(), TICKERS_PATH);
    match client.get_tickers() {
        Ok(tickers) => {
            info!("Successfully fetched {} tickers.", tickers.len());
            tickers
        }
        Err(e) => {
            log_failure("tickers", &e);
            Vec::new()
        }
    }
}

/// Symbols of all listed products
///
/// Without a symbol list nothing can be validated, so an empty or failed
/// products response is an error.
pub fn available_symbols(client: &DeltaClient) -> anyhow::Result<HashSet<String>> {
    let symbols: HashSet<String> = fetch_products(client)
        .into_iter()
        .map(|p| p.symbol)
        .collect();
    if symbols.is_empty() {
        bail!("Could not retrieve list of available symbols. Exiting.");
    }
    info!("{} symbols available", symbols.len());
    Ok(symbols)
}

fn log_failure(what: &str, e: &FetchError) {
    if e.is_malformed() {
        error!("Unexpected response format for {}: {}", what, e);
    } else {
        warn!("Network or API error fetching {}: {}", what, e);
    }
}
