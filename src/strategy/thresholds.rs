//! Adaptive RSI thresholds.
//!
//! Each consecutive failure widens the no-trade band between the buy
//! and sell thresholds, bounded by a floor and a ceiling. Thresholds are
//! recomputed from the failure counter every cycle.

use tracing::debug;

use crate::config::TradingConfig;
use crate::types::RsiThresholds;

#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub base_buy: f64,
    pub base_sell: f64,
    /// Widening per consecutive failure.
    pub step: f64,
    pub buy_floor: f64,
    pub sell_ceiling: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            base_buy: 40.0,
            base_sell: 60.0,
            step: 2.0,
            buy_floor: 20.0,
            sell_ceiling: 80.0,
        }
    }
}

impl From<&TradingConfig> for ThresholdConfig {
    fn from(cfg: &TradingConfig) -> Self {
        Self {
            base_buy: cfg.rsi_buy_threshold,
            base_sell: cfg.rsi_sell_threshold,
            step: cfg.threshold_step,
            buy_floor: cfg.rsi_buy_floor,
            sell_ceiling: cfg.rsi_sell_ceiling,
        }
    }
}

pub struct ThresholdAdapter {
    config: ThresholdConfig,
}

impl ThresholdAdapter {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn base(&self) -> RsiThresholds {
        RsiThresholds {
            buy: self.config.base_buy,
            sell: self.config.base_sell,
        }
    }

    /// Thresholds for the given consecutive-failure count.
    pub fn adapt(&self, failures: u32) -> RsiThresholds {
        if failures == 0 {
            return self.base();
        }

        let widen = self.config.step * failures as f64;
        let thresholds = RsiThresholds {
            buy: (self.config.base_buy - widen).max(self.config.buy_floor),
            sell: (self.config.base_sell + widen).min(self.config.sell_ceiling),
        };

        debug!(
            failures,
            buy = thresholds.buy,
            sell = thresholds.sell,
            "RSI thresholds widened"
        );
        thresholds
    }
}
