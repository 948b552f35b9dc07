use super::{ensure_len, IndicatorError};

/// RSI from simple (not Wilder-smoothed) averages of the last `period` deltas.
///
/// A window with no losses reads 100, a window with no movement at all
/// reads 50. Neither case produces NaN or infinity.
pub fn rsi(closes: &[f64], period: usize) -> Result<f64, IndicatorError> {
    // `period` deltas need `period + 1` closes.
    ensure_len(closes, period + 1)?;
    if period == 0 {
        return Err(IndicatorError::InsufficientData { required: 1, available: 0 });
    }

    let window = &closes[closes.len() - period - 1..];
    let (gain_sum, loss_sum) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - 100.0 / (1.0 + rs))
}
