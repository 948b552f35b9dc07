//! Prioritised trade decision.
//!
//! Tiers are checked in order and the first one that fires wins:
//! trend/RSI, then Bollinger breach, then MACD crossover. Every tier
//! requires the base balance to reach the minimum trade amount.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::IndicatorSnapshot;
use crate::types::{RsiThresholds, Side};

/// Which rule produced a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    TrendRsi,
    Bollinger,
    Macd,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::TrendRsi => write!(f, "trend/rsi"),
            Tier::Bollinger => write!(f, "bollinger"),
            Tier::Macd => write!(f, "macd"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Trade { side: Side, tier: Tier },
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Trade { side, tier } => write!(f, "{side} ({tier})"),
            Decision::Hold => write!(f, "hold"),
        }
    }
}

/// Evaluate the tiers against the current thresholds and balance.
pub fn decide(
    snapshot: &IndicatorSnapshot,
    thresholds: &RsiThresholds,
    balance: f64,
    min_trade_amount: f64,
) -> Decision {
    let funded = balance >= min_trade_amount;
    let s = snapshot;

    let tiers = [
        (
            Tier::TrendRsi,
            s.close > s.ma30 && s.rsi < thresholds.buy,
            s.close < s.ma30 && s.rsi > thresholds.sell,
        ),
        (Tier::Bollinger, s.close < s.lower_band, s.close > s.upper_band),
        (Tier::Macd, s.macd > s.macd_signal, s.macd < s.macd_signal),
    ];

    for (tier, buy, sell) in tiers {
        if buy && funded {
            return Decision::Trade { side: Side::Buy, tier };
        }
        if sell && funded {
            return Decision::Trade { side: Side::Sell, tier };
        }
    }

    Decision::Hold
}
