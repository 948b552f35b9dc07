//! Order executor.
//!
//! Submits market orders with a bounded retry policy. Transient exchange
//! failures are retried after a fixed delay; invalid requests abort at
//! once. Delays go through a `Sleeper` so tests never wait.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::sleeper::Sleeper;
use crate::config::ExecutionConfig;
use crate::exchange::Exchange;
use crate::types::{BotError, ExchangeError, OrderResult, Side};

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&ExecutionConfig> for RetryPolicy {
    fn from(cfg: &ExecutionConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            delay: Duration::from_secs(cfg.retry_delay_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct OrderExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl OrderExecutor {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Place a market order, retrying transient failures.
    ///
    /// Runs to completion or exhaustion; there is no mid-order cancellation.
    pub async fn place_order(
        &self,
        exchange: &dyn Exchange,
        pair: &str,
        amount: f64,
        side: Side,
    ) -> Result<OrderResult, BotError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<ExchangeError> = None;

        for attempt in 1..=max_attempts {
            match exchange.submit_market_order(pair, amount, side).await {
                Ok(order) => {
                    info!(
                        pair,
                        side = %side,
                        amount,
                        price = order.price,
                        attempt,
                        order_id = %order.order_id,
                        "Order placed"
                    );
                    return Ok(order);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        pair,
                        side = %side,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Order attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.delay).await;
                    }
                }
                Err(e) => {
                    error!(pair, side = %side, error = %e, "Order rejected, not retrying");
                    return Err(BotError::InvalidOrderRequest(e.to_string()));
                }
            }
        }

        error!(pair, side = %side, attempts = max_attempts, "Order failed after all attempts");
        Err(BotError::Connectivity {
            attempts: max_attempts,
            source: last_error
                .unwrap_or_else(|| ExchangeError::Network("no attempt made".to_string())),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
