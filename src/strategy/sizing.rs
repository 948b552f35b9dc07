//! Position sizing.
//!
//! Buy size scales logarithmically with cumulative realised gain, so that
//! profit slowly raises risk appetite. Sells always close the full balance.

use tracing::debug;

use crate::config::TradingConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SizingConfig {
    /// Fraction of the balance committed per buy at size factor 1.
    pub base_max_fraction: f64,
    /// Upper bound of the size factor.
    pub max_factor: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_max_fraction: 0.1,
            max_factor: 10.0,
        }
    }
}

impl From<&TradingConfig> for SizingConfig {
    fn from(cfg: &TradingConfig) -> Self {
        Self {
            base_max_fraction: cfg.max_position_fraction,
            max_factor: cfg.max_size_factor,
        }
    }
}

// ---------------------------------------------------------------------------
// Sizer
// ---------------------------------------------------------------------------

pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// `clamp(ln(max(gain + 1, 1)), 1, max_factor)`.
    ///
    /// Losses never shrink the factor below 1.
    pub fn size_factor(&self, cumulative_gain: f64) -> f64 {
        let raw = (cumulative_gain + 1.0).max(1.0).ln();
        raw.clamp(1.0, self.config.max_factor)
    }

    pub fn adjusted_max_fraction(&self, cumulative_gain: f64) -> f64 {
        self.config.base_max_fraction * self.size_factor(cumulative_gain)
    }

    /// Base-currency amount to buy.
    pub fn buy_size(&self, cumulative_gain: f64, balance: f64) -> f64 {
        let fraction = self.adjusted_max_fraction(cumulative_gain);
        let size = (balance * fraction).min(balance);
        debug!(
            cumulative_gain,
            balance,
            fraction = format!("{:.3}", fraction),
            size,
            "Buy sized"
        );
        size
    }

    /// Sells liquidate the whole available balance.
    pub fn sell_size(&self, balance: f64) -> f64 {
        balance
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
