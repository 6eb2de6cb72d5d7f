//! Monte Carlo risk simulation by empirical bootstrap of log returns.
//!
//! Each path draws `horizon_bars` log returns with replacement from the
//! observed history and sums them. The terminal simple return
//! `exp(Σ) - 1` is signed by the trade direction, so every statistic reads
//! from the position's point of view:
//!
//! - `value_at_risk`: loss at the `var_percentile` of terminal returns, in %
//! - `win_probability`: share of paths that end in profit, in %
//! - `expected_return`: mean terminal return, in %
//! - `volatility_percent`: stddev of observed log returns annualised with the
//!   timeframe's periods per year, in %
//!
//! Path `i` always uses the RNG derived from `(seed, symbol, timeframe, i)`,
//! so results are bit-identical across thread counts.

use rayon::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use vantage_core::domain::{Bar, Direction, Timeframe};
use vantage_core::indicators::log_returns;
use vantage_core::AnalyticsError;

use crate::rng::RngHierarchy;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of simulated paths (>= 1000).
    pub paths: usize,
    /// Bars simulated forward per path.
    pub horizon_bars: usize,
    /// Percentile of terminal returns reported as VaR, e.g. 5.0.
    pub var_percentile: f64,
    /// Minimum historical returns required.
    pub min_observations: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: 2_000,
            horizon_bars: 24,
            var_percentile: 5.0,
            min_observations: 30,
            seed: 42,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.paths < 1_000 {
            return Err(AnalyticsError::invalid(format!(
                "monte carlo needs >= 1000 paths, got {}",
                self.paths
            )));
        }
        if self.horizon_bars == 0 {
            return Err(AnalyticsError::invalid("horizon_bars must be >= 1"));
        }
        if !(self.var_percentile > 0.0 && self.var_percentile < 50.0) {
            return Err(AnalyticsError::invalid("var_percentile must be in (0, 50)"));
        }
        if self.min_observations < 2 {
            return Err(AnalyticsError::invalid("min_observations must be >= 2"));
        }
        Ok(())
    }
}

// ─── Request / result ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// NEUTRAL is simulated from the long side.
    pub direction: Direction,
    /// Historical log returns, oldest first.
    pub returns: Vec<f64>,
}

impl SimulationRequest {
    pub fn from_bars(symbol: impl Into<String>, timeframe: Timeframe, direction: Direction, bars: &[Bar]) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            direction,
            returns: log_returns(bars),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSimulationResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub volatility_percent: f64,
    /// Positive loss in percent at the configured percentile; 0 when even
    /// that percentile is profitable.
    pub value_at_risk: f64,
    /// In [0, 100].
    pub win_probability: f64,
    pub expected_return: f64,
    pub paths: usize,
    pub horizon_bars: usize,
    pub observations: usize,
    pub seed: u64,
}

// ─── Simulator ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
    rngs: RngHierarchy,
}

impl Default for MonteCarloSimulator {
    fn default() -> Self {
        let config = MonteCarloConfig::default();
        let rngs = RngHierarchy::new(config.seed);
        Self { config, rngs }
    }
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let rngs = RngHierarchy::new(config.seed);
        Ok(Self { config, rngs })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub fn simulate(&self, req: &SimulationRequest) -> Result<RiskSimulationResult, AnalyticsError> {
        let n = req.returns.len();
        if n < self.config.min_observations {
            return Err(AnalyticsError::StatisticalInsufficiency {
                what: "historical returns",
                required: self.config.min_observations,
                available: n,
            });
        }
        if let Some(bad) = req.returns.iter().find(|r| !r.is_finite()) {
            return Err(AnalyticsError::invalid(format!(
                "historical returns for {} contain non-finite value {bad}",
                req.symbol
            )));
        }

        let sign = if req.direction == Direction::Short { -1.0 } else { 1.0 };
        let horizon = self.config.horizon_bars;
        let returns = &req.returns;

        let mut terminals: Vec<f64> = (0..self.config.paths as u64)
            .into_par_iter()
            .map(|path| {
                let mut rng = self.rngs.rng_for(&req.symbol, req.timeframe, path);
                let log_sum: f64 = (0..horizon).map(|_| returns[rng.gen_range(0..n)]).sum();
                sign * log_sum.exp_m1() * 100.0
            })
            .collect();

        let paths = terminals.len();
        let expected_return = terminals.iter().sum::<f64>() / paths as f64;
        let wins = terminals.iter().filter(|&&t| t > 0.0).count();
        let win_probability = 100.0 * wins as f64 / paths as f64;

        terminals.sort_by(f64::total_cmp);
        let tail = percentile_sorted(&terminals, self.config.var_percentile);
        let value_at_risk = (-tail).max(0.0);

        let volatility_percent =
            sample_stddev(returns) * req.timeframe.periods_per_year().sqrt() * 100.0;

        let result = RiskSimulationResult {
            symbol: req.symbol.clone(),
            timeframe: req.timeframe,
            direction: req.direction,
            volatility_percent,
            value_at_risk,
            win_probability,
            expected_return,
            paths,
            horizon_bars: horizon,
            observations: n,
            seed: self.config.seed,
        };
        check_result(&result)?;
        Ok(result)
    }
}

fn check_result(r: &RiskSimulationResult) -> Result<(), AnalyticsError> {
    for (name, value) in [
        ("volatility_percent", r.volatility_percent),
        ("value_at_risk", r.value_at_risk),
        ("expected_return", r.expected_return),
        ("win_probability", r.win_probability),
    ] {
        if !value.is_finite() {
            return Err(AnalyticsError::invariant(format!(
                "simulation {name} is not finite for {}",
                r.symbol
            )));
        }
    }
    if !(0.0..=100.0).contains(&r.win_probability) {
        return Err(AnalyticsError::invariant(format!(
            "win probability {} outside [0, 100]",
            r.win_probability
        )));
    }
    Ok(())
}

fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Linear-interpolated percentile of sorted data (`p` in [0, 100]).
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
