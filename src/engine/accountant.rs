//! Cumulative gain tracking and cycle reports.
//!
//! Gain is a cash-flow proxy: sells add their notional, buys subtract it.
//! Fees, slippage and cost basis are not modelled.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::strategy::Decision;
use crate::types::{BotState, OrderResult, Side};

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of one select → decide → execute cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub pair: Option<String>,
    pub decision: Option<Decision>,
    pub order: Option<OrderResult>,
    pub gain_delta: f64,
    pub cumulative_gain: f64,
    pub failure_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl CycleReport {
    pub fn new(state: &BotState) -> Self {
        Self {
            cycle_number: state.cycle_count,
            pair: state.selected_pair.as_ref().map(|p| p.symbol.clone()),
            decision: None,
            order: None,
            gain_delta: 0.0,
            cumulative_gain: state.cumulative_gain,
            failure_count: state.failure_count,
            timestamp: Utc::now(),
        }
    }

    /// Refresh the running totals from state at the end of a cycle.
    pub fn finish(mut self, state: &BotState) -> Self {
        self.pair = state.selected_pair.as_ref().map(|p| p.symbol.clone());
        self.cumulative_gain = state.cumulative_gain;
        self.failure_count = state.failure_count;
        self
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = self
            .decision
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "Cycle #{}: pair={} decision={} gain_delta={:.2} total_gain={:.2} failures={}",
            self.cycle_number,
            self.pair.as_deref().unwrap_or("-"),
            decision,
            self.gain_delta,
            self.cumulative_gain,
            self.failure_count,
        )
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

pub struct Accountant;

impl Accountant {
    /// Signed cash flow of a fill.
    pub fn trade_gain(order: &OrderResult) -> f64 {
        match order.side {
            Side::Sell => order.notional(),
            Side::Buy => -order.notional(),
        }
    }

    /// Apply a fill to the running gain and return the delta.
    pub fn record_fill(state: &mut BotState, order: &OrderResult) -> f64 {
        let gain = Self::trade_gain(order);
        state.cumulative_gain += gain;

        info!(
            pair = %order.symbol,
            side = %order.side,
            trade_gain = format!("{:.2}", gain),
            total_gain = format!("{:.2}", state.cumulative_gain),
            "Trade gain recorded"
        );
        gain
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
