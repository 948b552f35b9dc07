/// Exponential moving average, computed incrementally.
///
/// Behaviour:
///   sample 0  → value = price (first observation, no bias adjustment)
///   sample 1+ → value = α·price + (1−α)·prev   where α = 2/(span+1)
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    pub value: f64,
    count: usize,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span as f64 + 1.0),
            value: 0.0,
            count: 0,
        }
    }

    /// Feed one value, return the current EMA.
    pub fn update(&mut self, price: f64) -> f64 {
        if self.count == 0 {
            self.value = price;
        } else {
            self.value = self.alpha * price + (1.0 - self.alpha) * self.value;
        }
        self.count += 1;
        self.value
    }
}

/// EMA evaluated at every sample of `values`.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let mut ema = Ema::new(span);
    values.iter().map(|&v| ema.update(v)).collect()
}
