//! End-to-end runs of the trading loop against the scripted exchange.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pairbot::config::TradingConfig;
use pairbot::engine::executor::{OrderExecutor, RetryPolicy};
use pairbot::engine::runner::{Runner, StopReason};
use pairbot::engine::sleeper::{RecordingSleeper, Sleeper};
use pairbot::engine::trader::Trader;
use pairbot::exchange::paper::PaperExchange;
use pairbot::exchange::Exchange;
use pairbot::storage::RunFlagStore;
use pairbot::strategy::{Decision, Tier};
use pairbot::types::{Balances, BotState, ExchangeError, Side};

use crate::mock_exchange::ScriptedExchange;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 30 closes ending at 37 900 with RSI ≈ 33 and the close far above MA30.
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

fn wallet(btc: f64) -> Balances {
    let mut b = Balances::new();
    b.insert("USD".into(), 10_000.0);
    b.insert("BTC".into(), btc);
    b
}

fn trading() -> TradingConfig {
    TradingConfig {
        min_trade_amount: 0.01,
        ..TradingConfig::default()
    }
}

fn temp_flag() -> RunFlagStore {
    let mut p = std::env::temp_dir();
    p.push(format!("pairbot_it_flag_{}.json", uuid::Uuid::new_v4()));
    RunFlagStore::new(p)
}

fn trader(exchange: Arc<dyn Exchange>, retry_sleeper: Arc<RecordingSleeper>) -> Trader {
    Trader::new(
        exchange,
        &trading(),
        OrderExecutor::new(RetryPolicy::default(), retry_sleeper),
    )
}

/// Loop sleeper that clears the run flag once `cycles` sleeps have happened.
struct StopAfterCycles {
    flag: RunFlagStore,
    remaining: Mutex<u32>,
}

impl StopAfterCycles {
    fn new(flag: RunFlagStore, cycles: u32) -> Arc<Self> {
        Arc::new(Self {
            flag,
            remaining: Mutex::new(cycles),
        })
    }
}

#[async_trait]
impl Sleeper for StopAfterCycles {
    async fn sleep(&self, _duration: Duration) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.flag.write(false).unwrap();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_cycle_buys_ten_percent() {
    let exchange = Arc::new(ScriptedExchange::new(wallet(0.5)).with_market("BTC", buy_setup()));
    let t = trader(exchange.clone(), Arc::new(RecordingSleeper::new()));
    let mut state = BotState::new(t.initial_thresholds());

    let report = t.run_cycle(&mut state).await;

    assert_eq!(
        report.decision,
        Some(Decision::Trade { side: Side::Buy, tier: Tier::TrendRsi })
    );
    let orders = exchange.orders();
    assert_eq!(orders.len(), 1);
    assert!((orders[0].amount - 0.05).abs() < 1e-12);
    assert_eq!(orders[0].side, Side::Buy);
    assert!((state.balances["BTC"] - 0.55).abs() < 1e-12);
}

#[tokio::test]
async fn test_loop_runs_until_flag_cleared() {
    let exchange = Arc::new(ScriptedExchange::new(wallet(0.5)).with_market("BTC", buy_setup()));
    let flag = temp_flag();
    flag.write(true).unwrap();

    let t = trader(exchange.clone(), Arc::new(RecordingSleeper::new()));
    let mut state = BotState::new(t.initial_thresholds());
    let runner = Runner::new(
        t,
        flag.clone(),
        StopAfterCycles::new(flag.clone(), 2),
        Duration::from_secs(60),
    );

    let (reason, snapshot) = runner
        .run_until_stopped(&mut state, std::future::pending())
        .await;

    assert_eq!(reason, StopReason::FlagCleared);
    assert_eq!(snapshot.cycle_count, 2);
    assert_eq!(snapshot.selected_pair.as_deref(), Some("BTC-USD"));

    // The second buy is sized from the refreshed balance.
    let orders = exchange.orders();
    assert_eq!(orders.len(), 2);
    assert!((orders[0].amount - 0.05).abs() < 1e-12);
    assert!((orders[1].amount - 0.055).abs() < 1e-12);
    assert!(!flag.read().unwrap());

    let _ = std::fs::remove_file(flag.path());
}

#[tokio::test]
async fn test_stopped_flag_touches_nothing() {
    let exchange = Arc::new(ScriptedExchange::new(wallet(0.5)).with_market("BTC", buy_setup()));
    let flag = temp_flag();
    flag.write(true).unwrap();
    flag.write(false).unwrap();

    let t = trader(exchange.clone(), Arc::new(RecordingSleeper::new()));
    let mut state = BotState::new(t.initial_thresholds());
    let runner = Runner::new(
        t,
        flag.clone(),
        Arc::new(RecordingSleeper::new()),
        Duration::from_secs(60),
    );

    let (reason, snapshot) = runner
        .run_until_stopped(&mut state, std::future::pending())
        .await;

    assert_eq!(reason, StopReason::FlagCleared);
    assert_eq!(snapshot.cycle_count, 0);
    assert_eq!(exchange.call_count(), 0);

    let _ = std::fs::remove_file(flag.path());
}

#[tokio::test]
async fn test_transient_order_failures_are_retried() {
    let exchange = Arc::new(ScriptedExchange::new(wallet(0.5)).with_market("BTC", buy_setup()));
    exchange.fail_next_orders(vec![
        ExchangeError::Network("connection reset".into()),
        ExchangeError::Network("timeout".into()),
    ]);

    let retry_sleeper = Arc::new(RecordingSleeper::new());
    let t = trader(exchange.clone(), retry_sleeper.clone());
    let mut state = BotState::new(t.initial_thresholds());

    let report = t.run_cycle(&mut state).await;

    assert!(report.order.is_some());
    assert_eq!(state.failure_count, 0);
    assert_eq!(exchange.orders().len(), 1);
    assert_eq!(retry_sleeper.calls(), vec![Duration::from_secs(2); 2]);
}

#[tokio::test]
async fn test_flat_market_widens_thresholds() {
    let exchange = Arc::new(ScriptedExchange::new(wallet(0.5)).with_market("BTC", vec![100.0; 40]));
    let t = trader(exchange.clone(), Arc::new(RecordingSleeper::new()));
    let mut state = BotState::new(t.initial_thresholds());

    for _ in 0..5 {
        let report = t.run_cycle(&mut state).await;
        assert_eq!(report.decision, Some(Decision::Hold));
    }
    assert_eq!(state.failure_count, 5);
    // Thresholds in force during the fifth cycle were widened by four steps.
    assert_eq!(state.thresholds.buy, 32.0);
    assert_eq!(state.thresholds.sell, 68.0);
    assert!(exchange.orders().is_empty());
}

#[tokio::test]
async fn test_paper_exchange_settles_wallet() {
    let data = ScriptedExchange::new(Balances::new()).with_market("BTC", buy_setup());
    let paper = Arc::new(PaperExchange::new(data, "USD", wallet(0.5)));
    let t = trader(paper.clone(), Arc::new(RecordingSleeper::new()));
    let mut state = BotState::new(t.initial_thresholds());

    let report = t.run_cycle(&mut state).await;
    let order = report.order.expect("paper order should fill");
    assert!(order.order_id.starts_with("paper-"));
    assert_eq!(order.price, 37_900.0);

    let balances = paper.fetch_balances().await.unwrap();
    assert!((balances["BTC"] - 0.55).abs() < 1e-12);
    assert!((balances["USD"] - (10_000.0 - 0.05 * 37_900.0)).abs() < 1e-6);
    assert!((state.cumulative_gain + 0.05 * 37_900.0).abs() < 1e-6);
}
