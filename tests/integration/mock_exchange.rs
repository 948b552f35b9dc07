//! Scripted exchange for integration testing.
//!
//! Serves fixed price history per pair, keeps an in-memory wallet, and
//! can be told to fail the next N order submissions. Implements both
//! `Exchange` and `MarketDataSource` so it can also sit underneath
//! `PaperExchange`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pairbot::exchange::{Exchange, MarketDataSource};
use pairbot::types::*;

pub struct ScriptedExchange {
    markets: Vec<MarketInfo>,
    closes: HashMap<String, Vec<f64>>,
    wallet: Mutex<Balances>,
    order_failures: Mutex<VecDeque<ExchangeError>>,
    orders: Mutex<Vec<OrderResult>>,
    calls: AtomicUsize,
}

impl ScriptedExchange {
    pub fn new(wallet: Balances) -> Self {
        Self {
            markets: Vec::new(),
            closes: HashMap::new(),
            wallet: Mutex::new(wallet),
            order_failures: Mutex::new(VecDeque::new()),
            orders: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// List a `BASE-USD` market with the given hourly and daily closes.
    pub fn with_market(mut self, base: &str, closes: Vec<f64>) -> Self {
        let symbol = format!("{base}-USD");
        self.markets.push(MarketInfo {
            symbol: symbol.clone(),
            base_currency: base.to_string(),
            quote_currency: "USD".to_string(),
            active: true,
        });
        self.closes.insert(symbol, closes);
        self
    }

    /// Fail the next order submissions with these errors, in order.
    pub fn fail_next_orders(&self, errors: Vec<ExchangeError>) {
        self.order_failures.lock().unwrap().extend(errors);
    }

    pub fn orders(&self) -> Vec<OrderResult> {
        self.orders.lock().unwrap().clone()
    }

    pub fn wallet(&self) -> Balances {
        self.wallet.lock().unwrap().clone()
    }

    /// Total number of calls across all methods.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn series(&self, pair: &str, granularity: Granularity) -> Result<PriceSeries, ExchangeError> {
        let closes = self
            .closes
            .get(pair)
            .ok_or_else(|| ExchangeError::InvalidRequest(format!("Unknown pair {pair}")))?;
        let step = Duration::seconds(granularity.as_secs() as i64);
        let start = Utc::now() - step * closes.len() as i32;
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + step * i as i32,
                open: close,
                high: close,
                low: close,
                close,
                volume: 10.0,
            })
            .collect();
        Ok(PriceSeries::new(pair, granularity, candles))
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn fetch_balances(&self) -> Result<Balances, ExchangeError> {
        self.touch();
        Ok(self.wallet())
    }

    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError> {
        self.touch();
        Ok(self.markets.clone())
    }

    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError> {
        self.touch();
        self.series(pair, granularity)
    }

    async fn submit_market_order(
        &self,
        pair: &str,
        amount: f64,
        side: Side,
    ) -> Result<OrderResult, ExchangeError> {
        self.touch();
        if let Some(err) = self.order_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let market = self
            .markets
            .iter()
            .find(|m| m.symbol == pair)
            .ok_or_else(|| ExchangeError::InvalidRequest(format!("Unknown pair {pair}")))?;
        let price = self
            .closes
            .get(pair)
            .and_then(|c| c.last().copied())
            .unwrap_or(0.0);

        {
            let mut wallet = self.wallet.lock().unwrap();
            let sign = if side == Side::Buy { 1.0 } else { -1.0 };
            *wallet.entry(market.base_currency.clone()).or_insert(0.0) += sign * amount;
            *wallet.entry(market.quote_currency.clone()).or_insert(0.0) -= sign * amount * price;
        }

        let order = OrderResult {
            order_id: format!("scripted-{}", uuid::Uuid::new_v4()),
            symbol: pair.to_string(),
            side,
            amount,
            price,
            timestamp: Utc::now(),
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedExchange {
    async fn fetch_active_markets(&self) -> Result<Vec<MarketInfo>, ExchangeError> {
        self.touch();
        Ok(self.markets.clone())
    }

    async fn fetch_price_series(
        &self,
        pair: &str,
        granularity: Granularity,
    ) -> Result<PriceSeries, ExchangeError> {
        self.touch();
        self.series(pair, granularity)
    }
}
