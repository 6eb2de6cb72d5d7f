//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    k: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, k: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        assert!(k > 0.0, "Bollinger multiplier must be > 0");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            k,
            band,
            name: format!("bollinger_{label}_{period}_{k}"),
        }
    }

    pub fn upper(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Upper)
    }

    pub fn middle(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Middle)
    }

    pub fn lower(period: usize, k: f64) -> Self {
        Self::new(period, k, BollingerBand::Lower)
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Mean and population standard deviation of a window of closes.
/// Returns `None` if any close is NaN.
pub fn mean_and_stddev(window: &[Bar]) -> Option<(f64, f64)> {
    if window.is_empty() || window.iter().any(|b| b.close.is_nan()) {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    Some((mean, variance.sqrt()))
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            if let Some((mean, stddev)) = mean_and_stddev(window) {
                result[i] = match self.band {
                    BollingerBand::Upper => mean + self.k * stddev,
                    BollingerBand::Middle => mean,
                    BollingerBand::Lower => mean - self.k * stddev,
                };
            }
        }

        result
    }
}
