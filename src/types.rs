//! Shared types for the trading loop.
//!
//! These types form the data model used across all modules, so that
//! exchange, strategy, and engine modules can depend on them without
//! circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::indicators::IndicatorError;

/// Wallet totals keyed by currency code. Ordered so iteration is stable.
pub type Balances = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Candle width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneHour,
    OneDay,
}

impl Granularity {
    pub fn as_secs(&self) -> u64 {
        match self {
            Granularity::OneHour => 3_600,
            Granularity::OneDay => 86_400,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::OneHour => write!(f, "1h"),
            Granularity::OneDay => write!(f, "1d"),
        }
    }
}

/// One OHLCV sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles for one pair at one granularity, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub pair: String,
    pub granularity: Granularity,
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(pair: &str, granularity: Granularity, candles: Vec<Candle>) -> Self {
        Self {
            pair: pair.to_string(),
            granularity,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Build an hourly series from bare closes (test fixtures).
    #[cfg(test)]
    pub fn from_closes(pair: &str, closes: &[f64]) -> Self {
        let start = Utc::now() - chrono::Duration::hours(closes.len() as i64);
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + chrono::Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        Self::new(pair, Granularity::OneHour, candles)
    }
}

/// A market as listed by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub active: bool,
}

/// A tradable pair whose base currency we hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCandidate {
    pub symbol: String,
    pub base_currency: String,
    pub balance: f64,
}

impl PairCandidate {
    /// Build a candidate from a market, if it is active and funded.
    pub fn from_market(market: &MarketInfo, balances: &Balances) -> Option<Self> {
        let balance = balances.get(&market.base_currency).copied().unwrap_or(0.0);
        if market.active && balance > 0.0 {
            Some(Self {
                symbol: market.symbol.clone(),
                base_currency: market.base_currency.clone(),
                balance,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for PairCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.symbol, self.balance, self.base_currency)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Fill returned by the exchange for a market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    /// Filled amount in base currency.
    pub amount: f64,
    /// Average fill price in quote currency (0 when the exchange omits it).
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl OrderResult {
    /// Quote-currency value of the fill.
    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.8} @ {:.2} [{}]",
            self.side, self.symbol, self.amount, self.price, self.order_id,
        )
    }
}

// ---------------------------------------------------------------------------
// Bot state
// ---------------------------------------------------------------------------

/// Current RSI buy/sell thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiThresholds {
    pub buy: f64,
    pub sell: f64,
}

impl fmt::Display for RsiThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buy<{:.0} sell>{:.0}", self.buy, self.sell)
    }
}

/// Process-wide trading state. One owner; passed `&mut` into each cycle.
#[derive(Debug, Clone)]
pub struct BotState {
    pub selected_pair: Option<PairCandidate>,
    pub failure_count: u32,
    pub cumulative_gain: f64,
    pub thresholds: RsiThresholds,
    pub balances: Balances,
    pub cycle_count: u64,
    /// Run flag as last read from storage.
    pub running: bool,
}

impl BotState {
    pub fn new(thresholds: RsiThresholds) -> Self {
        Self {
            selected_pair: None,
            failure_count: 0,
            cumulative_gain: 0.0,
            thresholds,
            balances: Balances::new(),
            cycle_count: 0,
            running: false,
        }
    }

    /// Balance of the base currency of the selected pair.
    pub fn available_balance(&self) -> f64 {
        self.selected_pair
            .as_ref()
            .and_then(|p| self.balances.get(&p.base_currency))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            selected_pair: self.selected_pair.as_ref().map(|p| p.symbol.clone()),
            thresholds: self.thresholds,
            failure_count: self.failure_count,
            cumulative_gain: self.cumulative_gain,
            cycle_count: self.cycle_count,
        }
    }
}

/// Read-only view of `BotState` for monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub selected_pair: Option<String>,
    pub thresholds: RsiThresholds,
    pub failure_count: u32,
    pub cumulative_gain: f64,
    pub cycle_count: u64,
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pair={} | rsi {} | failures={} | gain={:.2} | cycles={}",
            self.selected_pair.as_deref().unwrap_or("-"),
            self.thresholds,
            self.failure_count,
            self.cumulative_gain,
            self.cycle_count,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by an exchange backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExchangeError {
    /// Whether the call is worth repeating.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Network(_) | ExchangeError::Exchange(_))
    }
}

/// Per-pair / per-cycle failures. None of these stop the loop.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Insufficient data for {pair}: {source}")]
    InsufficientData {
        pair: String,
        #[source]
        source: IndicatorError,
    },

    #[error("Indicator computation failed for {pair}: {source}")]
    Computation {
        pair: String,
        #[source]
        source: IndicatorError,
    },

    #[error("Connectivity error after {attempts} attempt(s): {source}")]
    Connectivity {
        attempts: u32,
        #[source]
        source: ExchangeError,
    },

    #[error("Market data unavailable for {pair}: {source}")]
    MarketData {
        pair: String,
        #[source]
        source: ExchangeError,
    },

    #[error("Invalid order request: {0}")]
    InvalidOrderRequest(String),
}

impl BotError {
    /// Classify an indicator failure for a pair.
    pub fn from_indicator(pair: &str, err: IndicatorError) -> Self {
        match err {
            IndicatorError::InsufficientData { .. } => BotError::InsufficientData {
                pair: pair.to_string(),
                source: err,
            },
            IndicatorError::NonFinite(_) => BotError::Computation {
                pair: pair.to_string(),
                source: err,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
