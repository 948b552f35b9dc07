//! Paper trading exchange.
//!
//! Real market data, simulated wallet. Market orders fill instantly at the
//! last hourly close; no fees or slippage. Only markets quoted in the
//! wallet's quote currency are listed, since nothing else can settle.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

use super::{Exchange, MarketDataSource};
use crate::types::{
    Balances, ExchangeError, Granularity, MarketInfo, OrderResult, PriceSeries, Side,
};

pub struct PaperExchange<M: MarketDataSource> {
    market_data: M,
    quote_currency: String,
    wallet: Mutex<Balances>,
    markets: Mutex<HashMap<String, MarketInfo>>,
}

impl<M: MarketDataSource> PaperExchange<M> {
    pub fn new(market_data: M, quote_currency: &str, initial_balances: Balances) -> Self {
        info!(
            quote = quote_currency,
            balances = ?initial_balances,
            "Paper wallet initialised"
        );
        Self {
            market_data,
            quote_currency: quote_currency.to_string(),
            wallet: Mutex::new(initial_balances),
            markets: Mutex::new(HashMap::new()),
        }
    }

    fn wallet(&self) -> Result<std::sync::MutexGuard<'_, Balances>, ExchangeError> {
        self.wallet
            .lock()
            .map_err(|_| ExchangeError::Exchange("paper wallet lock poisoned".into()))
    }

    async fn market(&self, pair: &str) -> Result<MarketInfo, ExchangeError> {
        let cached = self
            .markets
            .lock()
            .ok()
            .and_then(|m| m.get(pair).cloned());
        if let Some(market) = cached {
            return Ok(market);
        }

        self.fetch_active_markets()
            .await?
            .into_iter()
            .find(|m| m.symbol == pair)
            .ok_or_else(|| ExchangeError::InvalidRequest(format!("Unknown market {pair}")))
    }

    async fn last_price(&self, pair: &str) -> Result<f64, ExchangeError> {
        let series = self
            .market_data
            .fetch_price_series(pair, Granularity::OneHour)
            .await?;
        series
            .last_close()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| ExchangeError::Exchange(format!("No price available for {pair}")))
    }
}

#[async_trait]
impl<M: MarketDataSource> Exchange for PaperExchange<M> {
    async fn fetch_balances(&self) -> Result<Balances, ExchangeError> {
        Ok(self.wallet()?.clone())
    }

    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError> {
        let markets: Vec<MarketInfo> = self
            .market_data
            .fetch_active_markets()
            .await?
            .into_iter()
            .filter(|m| m.quote_currency == self.quote_currency)
            .collect();

        if let Ok(mut cache) = self.markets.lock() {
            cache.clear();
            cache.extend(markets.iter().map(|m| (m.symbol.clone(), m.clone())));
        }
        Ok(markets)
    }

    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError> {
        self.market_data.fetch_price_series(pair, granularity).await
    }

    async fn submit_market_order(
        &self,
        pair: &str,
        amount: f64,
        side: Side,
    ) -> Result<OrderResult, ExchangeError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ExchangeError::InvalidRequest(format!(
                "Order amount must be positive, got {amount}"
            )));
        }

        let market = self.market(pair).await?;
        if !market.active {
            return Err(ExchangeError::InvalidRequest(format!("Market {pair} is not active")));
        }
        let price = self.last_price(pair).await?;
        let notional = amount * price;

        {
            let mut wallet = self.wallet()?;
            let base = wallet.get(&market.base_currency).copied().unwrap_or(0.0);
            let quote = wallet.get(&market.quote_currency).copied().unwrap_or(0.0);

            let (new_base, new_quote) = match side {
                Side::Buy if quote < notional => {
                    return Err(ExchangeError::Exchange(format!(
                        "Insufficient {} balance: need {notional:.2}, have {quote:.2}",
                        market.quote_currency
                    )));
                }
                Side::Sell if base < amount => {
                    return Err(ExchangeError::Exchange(format!(
                        "Insufficient {} balance: need {amount}, have {base}",
                        market.base_currency
                    )));
                }
                Side::Buy => (base + amount, quote - notional),
                Side::Sell => (base - amount, quote + notional),
            };

            wallet.insert(market.base_currency.clone(), new_base);
            wallet.insert(market.quote_currency.clone(), new_quote);
        }

        let order = OrderResult {
            order_id: format!("paper-{}", uuid::Uuid::new_v4()),
            symbol: pair.to_string(),
            side,
            amount,
            price,
            timestamp: Utc::now(),
        };
        debug!(order = %order, "[PAPER] Order filled");
        Ok(order)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
