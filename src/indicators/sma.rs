use super::{ensure_len, IndicatorError};

/// Simple moving average of the last `window` values.
pub fn sma(values: &[f64], window: usize) -> Result<f64, IndicatorError> {
    ensure_len(values, window)?;
    let tail = &values[values.len() - window..];
    Ok(tail.iter().sum::<f64>() / window as f64)
}
