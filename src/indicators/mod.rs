//! Technical indicators over a close-price series.
//!
//! Everything here is a pure function of the input slice. The snapshot
//! evaluates each indicator at the most recent sample.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::PriceSeries;

/// Samples required before any indicator is considered meaningful.
pub const MIN_SAMPLES: usize = 30;

pub const MA_SHORT_WINDOW: usize = 20;
pub const MA_LONG_WINDOW: usize = 30;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_STD_DEVS: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Indicator values at the latest sample of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ma20: f64,
    pub ma30: f64,
    pub rsi: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

impl IndicatorSnapshot {
    /// Compute all indicators from a series with at least `MIN_SAMPLES` candles.
    pub fn compute(series: &PriceSeries) -> Result<Self, IndicatorError> {
        Self::from_closes(&series.closes())
    }

    pub fn from_closes(closes: &[f64]) -> Result<Self, IndicatorError> {
        ensure_len(closes, MIN_SAMPLES)?;
        if closes.iter().any(|c| !c.is_finite()) {
            return Err(IndicatorError::NonFinite("close"));
        }

        let close = closes[closes.len() - 1];
        let ma20 = sma::sma(closes, MA_SHORT_WINDOW)?;
        let ma30 = sma::sma(closes, MA_LONG_WINDOW)?;
        let rsi = rsi::rsi(closes, RSI_PERIOD)?;
        let bands = bollinger::bollinger(closes, BOLLINGER_WINDOW, BOLLINGER_STD_DEVS)?;
        let macd = macd::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?;

        let snapshot = Self {
            close,
            ma20,
            ma30,
            rsi,
            upper_band: bands.upper,
            lower_band: bands.lower,
            macd: macd.macd,
            macd_signal: macd.signal,
        };
        snapshot.check_finite()?;
        Ok(snapshot)
    }

    fn check_finite(&self) -> Result<(), IndicatorError> {
        let fields = [
            ("ma20", self.ma20),
            ("ma30", self.ma30),
            ("rsi", self.rsi),
            ("bollinger", self.upper_band),
            ("bollinger", self.lower_band),
            ("macd", self.macd),
            ("macd_signal", self.macd_signal),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(IndicatorError::NonFinite(name)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for IndicatorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "close={:.4} ma30={:.4} rsi={:.1} bb=[{:.4}, {:.4}] macd={:.4}/{:.4}",
            self.close,
            self.ma30,
            self.rsi,
            self.lower_band,
            self.upper_band,
            self.macd,
            self.macd_signal,
        )
    }
}

pub(crate) fn ensure_len(values: &[f64], required: usize) -> Result<(), IndicatorError> {
    if values.len() < required || required == 0 {
        return Err(IndicatorError::InsufficientData {
            required,
            available: values.len(),
        });
    }
    Ok(())
}
