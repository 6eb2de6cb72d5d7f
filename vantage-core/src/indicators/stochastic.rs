//! Stochastic Oscillator.
//!
//! %K = 100 * (close - lowest_low) / (highest_high - lowest_low) over k_period bars.
//! %D = SMA(%K, d_period).
//! A window with no range (highest_high == lowest_low) yields %K = 50.
//! Lookback: k_period - 1 for %K, k_period + d_period - 2 for %D.

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which stochastic line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    line: StochasticLine,
    name: String,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize, line: StochasticLine) -> Self {
        assert!(k_period >= 1, "Stochastic %K period must be >= 1");
        assert!(d_period >= 1, "Stochastic %D period must be >= 1");
        let label = match line {
            StochasticLine::K => "k",
            StochasticLine::D => "d",
        };
        Self {
            k_period,
            d_period,
            line,
            name: format!("stoch_{label}_{k_period}_{d_period}"),
        }
    }

    pub fn k(k_period: usize, d_period: usize) -> Self {
        Self::new(k_period, d_period, StochasticLine::K)
    }

    pub fn d(k_period: usize, d_period: usize) -> Self {
        Self::new(k_period, d_period, StochasticLine::D)
    }

    fn percent_k(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut k = vec![f64::NAN; n];
        if n < self.k_period {
            return k;
        }

        for i in (self.k_period - 1)..n {
            let window = &bars[i + 1 - self.k_period..=i];
            let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let close = bars[i].close;
            if highest.is_nan() || lowest.is_nan() || close.is_nan() {
                continue;
            }
            let range = highest - lowest;
            k[i] = if range > 0.0 {
                (100.0 * (close - lowest) / range).clamp(0.0, 100.0)
            } else {
                50.0
            };
        }
        k
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            StochasticLine::K => self.k_period - 1,
            StochasticLine::D => self.k_period + self.d_period - 2,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let k = self.percent_k(bars);
        match self.line {
            StochasticLine::K => k,
            StochasticLine::D => sma_of_series(&k, self.d_period),
        }
    }
}
