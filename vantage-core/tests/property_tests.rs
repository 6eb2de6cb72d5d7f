//! Property tests for numeric invariants.
//!
//! Uses proptest to verify:
//! 1. Indicator bounds: RSI and Stochastic in [0, 100], Bollinger strictly ordered
//! 2. Risk geometry: stops and targets on the correct side of entry
//! 3. Sizing caps: Kelly in [0, 0.25], risk percentage <= 5
//! 4. Correlation range: Pearson in [-1, 1]
//! 5. Identity blindness: confidence unchanged by symbol/timeframe renaming

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

use vantage_core::confluence::{ConfluenceConfig, ConfluenceScorer};
use vantage_core::domain::{Bar, Direction, Timeframe};
use vantage_core::indicators::IndicatorEngine;
use vantage_core::risk::RiskFramework;
use vantage_core::sentiment::pearson;
use vantage_core::sizing::{PositionSizer, SizingRequest};
use vantage_core::volatility::VolatilityTier;
use vantage_core::weights::{CategoryWeights, WeightRow, WeightTable};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of closes with proportional intrabar ranges and varying volume.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    (
        prop::collection::vec(-0.04..0.04_f64, 30..120),
        0.001..0.02_f64,
        50.0..50_000.0_f64,
    )
        .prop_map(|(steps, range, start)| {
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let mut close = start;
            let mut bars = Vec::with_capacity(steps.len());
            for (i, step) in steps.iter().enumerate() {
                let open = close;
                close *= 1.0 + step;
                let high = open.max(close) * (1.0 + range);
                let low = open.min(close) * (1.0 - range);
                bars.push(Bar {
                    timestamp: base + chrono::Duration::hours(i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: 1_000.0 + (i % 7) as f64 * 150.0,
                });
            }
            bars
        })
}

fn arb_tier() -> impl Strategy<Value = VolatilityTier> {
    prop_oneof![
        Just(VolatilityTier::Low),
        Just(VolatilityTier::Medium),
        Just(VolatilityTier::High),
    ]
}

fn arb_timeframe() -> impl Strategy<Value = Timeframe> {
    (0..Timeframe::ALL.len()).prop_map(|i| Timeframe::ALL[i])
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

// ── 1. Indicator bounds ──────────────────────────────────────────────

proptest! {
    #[test]
    fn indicator_snapshot_respects_bounds(bars in arb_bars()) {
        match IndicatorEngine::default().compute(&bars) {
            Ok(set) => {
                prop_assert!((0.0..=100.0).contains(&set.rsi));
                prop_assert!((0.0..=100.0).contains(&set.stochastic.k));
                prop_assert!((0.0..=100.0).contains(&set.stochastic.d));
                prop_assert!(set.atr >= 0.0);
                prop_assert!(set.bollinger.lower < set.bollinger.middle);
                prop_assert!(set.bollinger.middle < set.bollinger.upper);
            }
            // A degenerate window is a recoverable input problem, never a bug.
            Err(e) => prop_assert!(!e.is_fatal(), "fatal error: {e}"),
        }
    }

    #[test]
    fn indicator_snapshot_is_deterministic(bars in arb_bars()) {
        let engine = IndicatorEngine::default();
        prop_assert_eq!(engine.compute(&bars), engine.compute(&bars));
    }
}

// ── 2. Risk geometry ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn levels_on_correct_side(
        entry in 0.01..100_000.0_f64,
        atr_frac in 0.0001..0.05_f64,
        direction in arb_direction(),
        tier in arb_tier(),
        tf in arb_timeframe(),
    ) {
        let atr = entry * atr_frac;
        let levels = RiskFramework::default()
            .compute_levels(entry, atr, direction, tier, tf)
            .unwrap();
        match direction {
            Direction::Long => {
                prop_assert!(levels.stop_loss < entry && entry < levels.take_profit);
            }
            _ => {
                prop_assert!(levels.take_profit < entry && entry < levels.stop_loss);
            }
        }
        prop_assert!(levels.risk_reward_ratio >= 0.0);
        let expected = levels.target_distance() / levels.stop_distance();
        prop_assert!((levels.risk_reward_ratio - expected).abs() < 1e-9);
    }
}

// ── 3. Sizing caps ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn sizing_respects_caps(
        win_rate in -0.5..1.5_f64,
        avg_win in -100.0..1_000.0_f64,
        avg_loss in -100.0..1_000.0_f64,
        balance in 1.0..10_000_000.0_f64,
        tier in arb_tier(),
        atr_pct in 0.01..20.0_f64,
    ) {
        let sizing = PositionSizer::default()
            .size(&SizingRequest {
                win_rate,
                avg_win,
                avg_loss,
                account_balance: balance,
                volatility_tier: tier,
                atr_percentage: atr_pct,
                max_risk_fraction: None,
            })
            .unwrap();
        prop_assert!((0.0..=0.25).contains(&sizing.kelly_fraction));
        prop_assert!(sizing.risk_percentage_of_account <= 5.0 + 1e-9);
        prop_assert!(sizing.risk_amount >= 0.0);
        if sizing.insufficient_statistics {
            prop_assert_eq!(sizing.risk_amount, 0.0);
        }
    }
}

// ── 4. Correlation range ─────────────────────────────────────────────

proptest! {
    #[test]
    fn pearson_in_unit_interval(
        pairs in prop::collection::vec((-1.0..1.0_f64, -0.2..0.2_f64), 2..200),
    ) {
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        if let Some(r) = pearson(&xs, &ys) {
            prop_assert!((-1.0..=1.0).contains(&r));
        }
    }
}

// ── 5. Identity blindness ────────────────────────────────────────────

proptest! {
    /// With every timeframe sharing one weight row, neither the symbol nor
    /// the timeframe can move the confidence.
    #[test]
    fn confidence_invariant_under_renaming(
        bars in arb_bars(),
        tf_a in arb_timeframe(),
        tf_b in arb_timeframe(),
    ) {
        let Ok(set) = IndicatorEngine::default().compute(&bars) else {
            return Ok(());
        };
        let row = CategoryWeights::new(0.4, 0.35, 0.15, 0.1);
        let table = WeightTable {
            version: 7,
            rows: Timeframe::ALL
                .iter()
                .map(|&timeframe| WeightRow { timeframe, weights: row })
                .collect(),
        };
        let scorer = ConfluenceScorer::new(ConfluenceConfig::default(), Arc::new(table)).unwrap();

        let a = scorer.score("BTCUSDT", tf_a, &set, &[], None).unwrap();
        let b = scorer.score("renamed-symbol", tf_b, &set, &[], None).unwrap();
        prop_assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        prop_assert_eq!(a.direction, b.direction);
        prop_assert!((0.0..=100.0).contains(&a.confidence));
    }
}
