//! Property tests for the Monte Carlo simulator.
//!
//! 1. Bounds: win probability in [0, 100], VaR non-negative, all finite
//! 2. Determinism: same seed and input give identical results
//! 3. Side symmetry: long and short win probabilities sum to at most 100

use proptest::prelude::*;

use vantage_core::domain::{Direction, Timeframe};
use vantage_runner::{MonteCarloConfig, MonteCarloSimulator, SimulationRequest};

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, 30..200)
}

fn request(direction: Direction, returns: Vec<f64>) -> SimulationRequest {
    SimulationRequest {
        symbol: "PROP".into(),
        timeframe: Timeframe::H1,
        direction,
        returns,
    }
}

fn simulator(seed: u64) -> MonteCarloSimulator {
    MonteCarloSimulator::new(MonteCarloConfig {
        paths: 1_000,
        horizon_bars: 8,
        seed,
        ..MonteCarloConfig::default()
    })
    .unwrap()
}

// ── 1. Bounds ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn results_are_bounded(returns in arb_returns(), seed in any::<u64>()) {
        let r = simulator(seed).simulate(&request(Direction::Long, returns)).unwrap();
        prop_assert!((0.0..=100.0).contains(&r.win_probability));
        prop_assert!(r.value_at_risk >= 0.0);
        prop_assert!(r.volatility_percent >= 0.0);
        prop_assert!(r.expected_return.is_finite());
        prop_assert_eq!(r.paths, 1_000);
    }
}

// ── 2. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn same_seed_same_result(returns in arb_returns(), seed in any::<u64>()) {
        let req = request(Direction::Short, returns);
        let a = simulator(seed).simulate(&req).unwrap();
        let b = simulator(seed).simulate(&req).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ── 3. Side symmetry ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn long_and_short_split_outcomes(returns in arb_returns(), seed in any::<u64>()) {
        let sim = simulator(seed);
        let long = sim.simulate(&request(Direction::Long, returns.clone())).unwrap();
        let short = sim.simulate(&request(Direction::Short, returns)).unwrap();
        // Same paths, opposite sign: a path is a win for at most one side.
        prop_assert!(long.win_probability + short.win_probability <= 100.0 + 1e-9);
        prop_assert!((long.expected_return + short.expected_return).abs() < 1e-6);
        prop_assert_eq!(long.volatility_percent, short.volatility_percent);
    }
}
