use super::{ensure_len, sma::sma, IndicatorError};

/// Bollinger Bands at the last sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Rolling SMA ± `num_std` sample standard deviations (ddof = 1).
pub fn bollinger(closes: &[f64], window: usize, num_std: f64) -> Result<Bands, IndicatorError> {
    // Sample stddev is undefined for a single point.
    ensure_len(closes, window.max(2))?;
    let middle = sma(closes, window)?;
    let tail = &closes[closes.len() - window..];
    let var = tail.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / (window - 1) as f64;
    let std = var.sqrt();
    Ok(Bands {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
    })
}
