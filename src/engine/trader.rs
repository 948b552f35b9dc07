//! One select → decide → execute cycle.
//!
//! A cycle walks `Idle → Evaluating → Deciding → Executing → Idle`.
//! Every exchange or data failure is logged and ends the cycle early;
//! `run_cycle` itself never fails.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::accountant::{Accountant, CycleReport};
use super::executor::OrderExecutor;
use super::selector::PairSelector;
use crate::config::TradingConfig;
use crate::exchange::Exchange;
use crate::strategy::{decide, Decision, PositionSizer, ThresholdAdapter};
use crate::types::{BotState, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Evaluating,
    Deciding,
    Executing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "idle"),
            CyclePhase::Evaluating => write!(f, "evaluating"),
            CyclePhase::Deciding => write!(f, "deciding"),
            CyclePhase::Executing => write!(f, "executing"),
        }
    }
}

pub struct Trader {
    exchange: Arc<dyn Exchange>,
    selector: PairSelector,
    thresholds: ThresholdAdapter,
    sizer: PositionSizer,
    executor: OrderExecutor,
    min_trade_amount: f64,
}

impl Trader {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        trading: &TradingConfig,
        executor: OrderExecutor,
    ) -> Self {
        Self {
            exchange,
            selector: PairSelector::new(trading.require_daily_history),
            thresholds: ThresholdAdapter::new(trading.into()),
            sizer: PositionSizer::new(trading.into()),
            executor,
            min_trade_amount: trading.min_trade_amount,
        }
    }

    /// Thresholds for a fresh state.
    pub fn initial_thresholds(&self) -> crate::types::RsiThresholds {
        self.thresholds.base()
    }

    fn transition(cycle: u64, from: &mut CyclePhase, to: CyclePhase) {
        debug!(cycle, from = %from, to = %to, "Cycle phase");
        *from = to;
    }

    /// Run one full cycle against `state`.
    pub async fn run_cycle(&self, state: &mut BotState) -> CycleReport {
        state.cycle_count += 1;
        let cycle = state.cycle_count;
        let mut phase = CyclePhase::Idle;
        let mut report = CycleReport::new(state);

        // --- Evaluating: pick the pair ---
        Self::transition(cycle, &mut phase, CyclePhase::Evaluating);
        let (balances, best) = self.selector.select(self.exchange.as_ref(), &state.thresholds).await;
        state.balances = balances;
        state.selected_pair = best.map(|b| b.candidate);

        let pair = match &state.selected_pair {
            Some(p) => p.symbol.clone(),
            None => {
                info!(cycle, "No pair selected, skipping cycle");
                Self::transition(cycle, &mut phase, CyclePhase::Idle);
                return report.finish(state);
            }
        };

        let snapshot = match self.selector.evaluate_pair(self.exchange.as_ref(), &pair).await {
            Ok(s) => s,
            Err(e) => {
                warn!(cycle, pair = %pair, error = %e, "Selected pair unusable, skipping cycle");
                Self::transition(cycle, &mut phase, CyclePhase::Idle);
                return report.finish(state);
            }
        };

        // --- Deciding ---
        Self::transition(cycle, &mut phase, CyclePhase::Deciding);
        state.thresholds = self.thresholds.adapt(state.failure_count);
        let balance = state.available_balance();
        let decision = decide(&snapshot, &state.thresholds, balance, self.min_trade_amount);
        report.decision = Some(decision);

        info!(
            cycle,
            pair = %pair,
            close = snapshot.close,
            ma30 = format!("{:.2}", snapshot.ma30),
            rsi = format!("{:.2}", snapshot.rsi),
            thresholds = %state.thresholds,
            balance,
            decision = %decision,
            "Decision made"
        );

        let side = match decision {
            Decision::Trade { side, .. } => side,
            Decision::Hold => {
                state.record_failure();
                info!(cycle, failures = state.failure_count, "No trade condition met");
                Self::transition(cycle, &mut phase, CyclePhase::Idle);
                return report.finish(state);
            }
        };

        // --- Executing ---
        Self::transition(cycle, &mut phase, CyclePhase::Executing);
        let amount = match side {
            Side::Buy => self.sizer.buy_size(state.cumulative_gain, balance),
            Side::Sell => self.sizer.sell_size(balance),
        };

        match self
            .executor
            .place_order(self.exchange.as_ref(), &pair, amount, side)
            .await
        {
            Ok(order) => {
                report.gain_delta = Accountant::record_fill(state, &order);
                report.order = Some(order);

                match self.exchange.fetch_balances().await {
                    Ok(b) => state.balances = b.into_iter().filter(|(_, v)| *v > 0.0).collect(),
                    Err(e) => warn!(cycle, error = %e, "Balance refresh failed"),
                }
            }
            Err(e) => {
                state.record_failure();
                warn!(cycle, pair = %pair, error = %e, failures = state.failure_count, "Order failed");
            }
        }

        Self::transition(cycle, &mut phase, CyclePhase::Idle);
        report.finish(state)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::executor::RetryPolicy;
    use crate::engine::sleeper::RecordingSleeper;
    use crate::exchange::MockExchange;
    use crate::strategy::Tier;
    use crate::types::{Balances, ExchangeError, MarketInfo, OrderResult, PriceSeries};
    use chrono::Utc;
    use mockall::Sequence;

    /// RSI ≈ 33.3 with the close well above MA30.
    fn buy_setup() -> Vec<f64> {
        let mut closes = vec![10_000.0; 15];
        closes.push(40_000.0);
        let mut last = 40_000.0;
        for i in 0..14 {
            last += if i % 2 == 0 { -600.0 } else { 300.0 };
            closes.push(last);
        }
        closes
    }

    fn wallet() -> Balances {
        let mut b = Balances::new();
        b.insert("BTC".into(), 0.5);
        b
    }

    fn btc_market() -> MarketInfo {
        MarketInfo {
            symbol: "BTC-USD".into(),
            base_currency: "BTC".into(),
            quote_currency: "USD".into(),
            active: true,
        }
    }

    fn filled(pair: &str, amount: f64, side: Side) -> OrderResult {
        OrderResult {
            order_id: "ord".into(),
            symbol: pair.to_string(),
            side,
            amount,
            price: 37_900.0,
            timestamp: Utc::now(),
        }
    }

    fn exchange_with(closes: Vec<f64>) -> MockExchange {
        let mut ex = MockExchange::new();
        ex.expect_fetch_balances().returning(|| Ok(wallet()));
        ex.expect_fetch_active_markets().returning(|| Ok(vec![btc_market()]));
        ex.expect_fetch_price_series()
            .returning(move |pair, _| Ok(PriceSeries::from_closes(pair, &closes)));
        ex
    }

    fn trader(ex: MockExchange, sleeper: Arc<RecordingSleeper>) -> Trader {
        let trading = TradingConfig {
            min_trade_amount: 0.01,
            ..TradingConfig::default()
        };
        Trader::new(
            Arc::new(ex),
            &trading,
            OrderExecutor::new(RetryPolicy::default(), sleeper),
        )
    }

    fn fresh_state(t: &Trader) -> BotState {
        BotState::new(t.initial_thresholds())
    }

    #[tokio::test]
    async fn test_end_to_end_buy() {
        let mut ex = exchange_with(buy_setup());
        ex.expect_submit_market_order()
            .times(1)
            .returning(|pair, amount, side| Ok(filled(pair, amount, side)));

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        let report = t.run_cycle(&mut state).await;

        assert_eq!(
            report.decision,
            Some(Decision::Trade { side: Side::Buy, tier: Tier::TrendRsi })
        );
        let order = report.order.unwrap();
        assert!((order.amount - 0.05).abs() < 1e-12);
        assert_eq!(report.pair.as_deref(), Some("BTC-USD"));
        assert!((state.cumulative_gain + 0.05 * 37_900.0).abs() < 1e-6);
        assert_eq!(state.failure_count, 0);
        assert_eq!(state.cycle_count, 1);
    }

    #[tokio::test]
    async fn test_short_history_places_no_order() {
        let mut ex = exchange_with(vec![100.0; 29]);
        ex.expect_submit_market_order().never();

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        let report = t.run_cycle(&mut state).await;

        assert!(report.decision.is_none());
        assert!(state.selected_pair.is_none());
        assert_eq!(state.failure_count, 0);
    }

    #[tokio::test]
    async fn test_hold_widens_thresholds_next_cycle() {
        let mut ex = exchange_with(vec![100.0; 40]);
        ex.expect_submit_market_order().never();

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);

        let report = t.run_cycle(&mut state).await;
        assert_eq!(report.decision, Some(Decision::Hold));
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.thresholds.buy, 40.0);

        t.run_cycle(&mut state).await;
        assert_eq!(state.failure_count, 2);
        assert_eq!(state.thresholds.buy, 38.0);
        assert_eq!(state.thresholds.sell, 62.0);
    }

    #[tokio::test]
    async fn test_retry_then_success_keeps_counter() {
        let mut ex = exchange_with(buy_setup());
        let mut seq = Sequence::new();
        ex.expect_submit_market_order()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(ExchangeError::Network("timeout".into())));
        ex.expect_submit_market_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|pair, amount, side| Ok(filled(pair, amount, side)));

        let sleeper = Arc::new(RecordingSleeper::new());
        let t = trader(ex, sleeper.clone());
        let mut state = fresh_state(&t);
        let report = t.run_cycle(&mut state).await;

        assert!(report.order.is_some());
        assert_eq!(state.failure_count, 0);
        assert_eq!(sleeper.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_order_counts_failure() {
        let mut ex = exchange_with(buy_setup());
        ex.expect_submit_market_order()
            .times(3)
            .returning(|_, _, _| Err(ExchangeError::Network("down".into())));

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        let report = t.run_cycle(&mut state).await;

        assert!(report.order.is_none());
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.cumulative_gain, 0.0);
    }

    #[tokio::test]
    async fn test_fill_keeps_failure_count() {
        // RSI ≈ 22, still a trend buy with thresholds widened to 32/68.
        let mut closes = vec![10_000.0; 15];
        closes.push(40_000.0);
        let mut last = 40_000.0;
        for i in 0..14 {
            last += if i % 2 == 0 { -700.0 } else { 200.0 };
            closes.push(last);
        }

        let mut ex = exchange_with(closes);
        ex.expect_submit_market_order()
            .times(1)
            .returning(|pair, amount, side| Ok(filled(pair, amount, side)));

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        state.failure_count = 4;
        state.thresholds = t.thresholds.adapt(4);

        let report = t.run_cycle(&mut state).await;
        assert_eq!(
            report.decision,
            Some(Decision::Trade { side: Side::Buy, tier: Tier::TrendRsi })
        );
        assert!(report.order.is_some());
        assert_eq!(state.failure_count, 4);
        assert_eq!(state.thresholds.buy, 32.0);
        assert_eq!(state.thresholds.sell, 68.0);
    }

    #[tokio::test]
    async fn test_rejected_order_counts_failure_only() {
        let mut ex = MockExchange::new();
        ex.expect_fetch_balances().times(1).returning(|| Ok(wallet()));
        ex.expect_fetch_active_markets().returning(|| Ok(vec![btc_market()]));
        let closes = buy_setup();
        ex.expect_fetch_price_series()
            .returning(move |pair, _| Ok(PriceSeries::from_closes(pair, &closes)));
        ex.expect_submit_market_order()
            .times(1)
            .returning(|_, _, _| Err(ExchangeError::InvalidRequest("size below minimum".into())));

        let sleeper = Arc::new(RecordingSleeper::new());
        let t = trader(ex, sleeper.clone());
        let mut state = fresh_state(&t);
        let report = t.run_cycle(&mut state).await;

        assert!(report.order.is_none());
        assert_eq!(report.gain_delta, 0.0);
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.cumulative_gain, 0.0);
        assert_eq!(state.balances, wallet());
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sell_closes_full_balance() {
        // Mirror of the buy setup: RSI ≈ 66.7 with the close well below MA30.
        let mut closes = vec![40_000.0; 15];
        closes.push(10_000.0);
        let mut last = 10_000.0;
        for i in 0..14 {
            last += if i % 2 == 0 { 600.0 } else { -300.0 };
            closes.push(last);
        }

        let mut ex = exchange_with(closes);
        ex.expect_submit_market_order()
            .times(1)
            .returning(|pair, amount, side| Ok(filled(pair, amount, side)));

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        state.cumulative_gain = -100.0;
        let report = t.run_cycle(&mut state).await;

        assert_eq!(
            report.decision,
            Some(Decision::Trade { side: Side::Sell, tier: Tier::TrendRsi })
        );
        let order = report.order.unwrap();
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.amount, 0.5);
        assert!((report.gain_delta - 0.5 * 37_900.0).abs() < 1e-6);
        assert!((state.cumulative_gain - (0.5 * 37_900.0 - 100.0)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_refreshed_balances_drop_empty_currencies() {
        let mut ex = MockExchange::new();
        let mut seq = Sequence::new();
        ex.expect_fetch_balances()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(wallet()));
        ex.expect_fetch_balances()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                let mut b = wallet();
                b.insert("BTC".into(), 0.55);
                b.insert("DOGE".into(), 0.0);
                Ok(b)
            });
        ex.expect_fetch_active_markets().returning(|| Ok(vec![btc_market()]));
        let closes = buy_setup();
        ex.expect_fetch_price_series()
            .returning(move |pair, _| Ok(PriceSeries::from_closes(pair, &closes)));
        ex.expect_submit_market_order()
            .returning(|pair, amount, side| Ok(filled(pair, amount, side)));

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        t.run_cycle(&mut state).await;

        assert_eq!(state.balances.get("BTC"), Some(&0.55));
        assert!(!state.balances.contains_key("DOGE"));
    }

    #[tokio::test]
    async fn test_exchange_outage_skips_cycle() {
        let mut ex = MockExchange::new();
        ex.expect_fetch_balances()
            .returning(|| Err(ExchangeError::Network("dns".into())));
        ex.expect_submit_market_order().never();

        let t = trader(ex, Arc::new(RecordingSleeper::new()));
        let mut state = fresh_state(&t);
        state.balances.insert("BTC".into(), 1.0);

        let report = t.run_cycle(&mut state).await;
        assert!(report.pair.is_none());
        assert!(state.balances.is_empty());
        assert_eq!(state.cycle_count, 1);
    }
}
