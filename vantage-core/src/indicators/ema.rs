//! Exponential Moving Average (EMA) over an arbitrary series.
//!
//! Recursive: EMA[t] = alpha * value[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA[0] = value[0]. There is no warmup; every index carries a value.

/// Compute EMA values from a pre-extracted f64 slice.
///
/// Used by MACD for both the fast/slow price EMAs and the signal line.
/// A NaN input taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "EMA period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n == 0 || values[0].is_nan() {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[0];
    result[0] = prev;

    for i in 1..n {
        if values[i].is_nan() {
            return result;
        }
        prev = values[i] * alpha + prev * (1.0 - alpha);
        result[i] = prev;
    }

    result
}
