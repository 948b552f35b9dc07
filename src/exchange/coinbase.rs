//! Coinbase Exchange public market data.
//!
//! API docs: https://docs.cdp.coinbase.com/exchange/reference
//! Base URL: https://api.exchange.coinbase.com
//! Auth: Not required for products and candles.
//! Candles are returned newest first as `[time, low, high, open, close, volume]`.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::MarketDataSource;
use crate::types::{Candle, ExchangeError, Granularity, MarketInfo, PriceSeries};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";

const USER_AGENT: &str = concat!("pairbot/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT_SECS: u64 = 15;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// `/products` entry. Only the fields we need.
#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    id: String,
    base_currency: String,
    quote_currency: String,
    /// "online", "offline", "internal", "delisted"
    #[serde(default)]
    status: String,
    #[serde(default)]
    trading_disabled: bool,
}

/// `[time, low, high, open, close, volume]`
type CoinbaseCandle = (i64, f64, f64, f64, f64, f64);

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct CoinbaseMarketData {
    http: Client,
    base_url: String,
}

impl CoinbaseMarketData {
    pub fn new(base_url: Option<&str>) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExchangeError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ExchangeError> {
        debug!(url, "Coinbase GET");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ExchangeError::Network(format!("Request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ExchangeError::Exchange(format!("Failed to parse response from {url}: {e}")))
    }

    fn to_market(product: CoinbaseProduct) -> MarketInfo {
        MarketInfo {
            active: product.status == "online" && !product.trading_disabled,
            symbol: product.id,
            base_currency: product.base_currency,
            quote_currency: product.quote_currency,
        }
    }

    fn to_series(pair: &str, granularity: Granularity, rows: Vec<CoinbaseCandle>) -> PriceSeries {
        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(|(time, low, high, open, close, volume)| {
                let timestamp = Utc.timestamp_opt(time, 0).single()?;
                Some(Candle { timestamp, open, high, low, close, volume })
            })
            .collect();
        candles.sort_by_key(|c| c.timestamp);
        PriceSeries::new(pair, granularity, candles)
    }
}

/// Map an HTTP failure onto the retry taxonomy.
fn classify_status(status: StatusCode, body: &str) -> ExchangeError {
    let message = format!("HTTP {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ExchangeError::Network(message)
    } else if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
        ExchangeError::InvalidRequest(message)
    } else {
        ExchangeError::Exchange(message)
    }
}

#[async_trait]
impl MarketDataSource for CoinbaseMarketData {
    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError> {
        let url = format!("{}/products", self.base_url);
        let products: Vec<CoinbaseProduct> = self.get_json(&url).await?;
        let markets: Vec<MarketInfo> = products.into_iter().map(Self::to_market).collect();
        info!(
            total = markets.len(),
            active = markets.iter().filter(|m| m.active).count(),
            "Coinbase products fetched"
        );
        Ok(markets)
    }

    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError> {
        let url = format!(
            "{}/products/{}/candles?granularity={}",
            self.base_url,
            urlencoding::encode(pair),
            granularity.as_secs()
        );
        let rows: Vec<CoinbaseCandle> = self.get_json(&url).await?;
        let series = Self::to_series(pair, granularity, rows);
        debug!(pair, %granularity, candles = series.len(), "Candles fetched");
        Ok(series)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
