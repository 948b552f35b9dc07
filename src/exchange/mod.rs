//! Exchange integrations.
//!
//! Defines the `Exchange` trait the trading loop runs against, plus the
//! narrower `MarketDataSource` for read-only market data. Implementations:
//! - Coinbase: public REST market data (products, candles)
//! - Paper: simulated wallet and fills on top of any market data source

pub mod coinbase;
pub mod paper;

use async_trait::async_trait;

use crate::types::{Balances, ExchangeError, Granularity, MarketInfo, OrderResult, PriceSeries, Side};

/// Abstraction over a spot exchange.
///
/// Errors are classified so callers can decide whether a retry makes
/// sense (`ExchangeError::is_transient`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Total wallet amounts per currency.
    async fn fetch_balances(&self) -> Result<Balances, ExchangeError>;

    /// All markets, in exchange listing order.
    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError>;

    /// Recent candles for a pair, oldest first.
    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError>;

    /// Submit a market order for `amount` units of the base currency.
    async fn submit_market_order(
        &self,
        pair: &str,
        amount: f64,
        side: Side,
    ) -> Result<OrderResult, ExchangeError>;
}

/// Read-only market data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError>;

    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError>;
}
