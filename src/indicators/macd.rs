use super::ema::{ema_series, Ema};
use super::{ensure_len, IndicatorError};

/// MACD line and its signal line at the last sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
}

/// MACD = EMA(fast) − EMA(slow) over closes; signal = EMA(signal) of MACD.
pub fn macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdOutput, IndicatorError> {
    ensure_len(closes, 1)?;
    let fast_line = ema_series(closes, fast);
    let slow_line = ema_series(closes, slow);

    let mut signal_ema = Ema::new(signal);
    let mut out = MacdOutput { macd: 0.0, signal: 0.0 };
    for (f, s) in fast_line.iter().zip(&slow_line) {
        out.macd = f - s;
        out.signal = signal_ema.update(out.macd);
    }
    Ok(out)
}
