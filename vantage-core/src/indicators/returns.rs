//! Close-to-close return series.

use crate::domain::Bar;

/// Natural-log returns `ln(close[t] / close[t-1])`; one shorter than `bars`.
pub fn log_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| (w[1].close / w[0].close).ln())
        .collect()
}

/// Simple returns `close[t] / close[t-1] - 1`; one shorter than `bars`.
pub fn simple_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect()
}
