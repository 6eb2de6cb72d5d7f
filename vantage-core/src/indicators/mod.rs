//! Concrete indicator implementations and the engine that snapshots them.
//!
//! Every indicator implements [`Indicator`]: bar history in, a numeric series of
//! the same length out, `NaN` during warmup. Multi-series indicators (MACD,
//! Bollinger, Stochastic) are exposed as separate named instances per output,
//! keeping the single-series trait unchanged.
//!
//! [`IndicatorEngine`] validates a window, checks it is long enough for every
//! configured indicator, and reads the last value of each series into an
//! [`IndicatorSet`].

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volume;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use engine::{
    BollingerValues, IndicatorConfig, IndicatorEngine, IndicatorSet, MacdValues,
    StochasticValues,
};
pub use macd::{Macd, MacdOutput};
pub use returns::{log_returns, simple_returns};
pub use rsi::Rsi;
pub use stochastic::{Stochastic, StochasticLine};
pub use volume::{volume_confirmation, VolumeConfirmation};

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// No indicator value at bar t may depend on price data from bar t+1 or later,
/// and no indicator may read the clock or a random source: identical input
/// yields bit-identical output.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "atr_14").
    fn name(&self) -> &str;

    /// Index of the first non-warmup value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLCV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one bar per hour.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
