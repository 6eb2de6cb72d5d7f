//! End-to-end scenarios through the pure pipeline:
//! bars → indicators → volatility → confluence → risk levels → sizing.

use chrono::{TimeZone, Utc};

use vantage_core::confluence::ConfluenceScorer;
use vantage_core::domain::{Bar, Direction, Timeframe};
use vantage_core::indicators::{volume_confirmation, IndicatorEngine};
use vantage_core::risk::{RiskConfig, RiskFramework};
use vantage_core::sizing::{PositionSizer, SizingRequest};
use vantage_core::volatility::{VolatilityClassifier, VolatilityTier};
use vantage_core::AnalyticsError;

// ── Helpers ──────────────────────────────────────────────────────────

/// Strictly rising closes with intrabar ranges of one cent.
fn rising_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.5;
            let open = if i == 0 { close } else { close - 0.5 };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: close + 0.01,
                low: open - 0.01,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

// ── Scenario 1: monotonic rise ───────────────────────────────────────

#[test]
fn rising_series_scores_long_with_rsi_100() {
    let bars = rising_bars(30);
    let engine = IndicatorEngine::default();
    let set = engine.compute(&bars).unwrap();
    assert_eq!(set.rsi, 100.0);

    let volume = volume_confirmation(&bars, engine.config().volume_period).unwrap();
    let signal = ConfluenceScorer::default()
        .score("BTCUSDT", Timeframe::H1, &set, &[], Some(&volume))
        .unwrap();
    assert_eq!(signal.direction, Direction::Long);
    assert!(signal.confidence > 50.0, "confidence {}", signal.confidence);
    assert_eq!(signal.entry_price, bars[29].close);
}

#[test]
fn ten_bar_window_is_insufficient_for_rsi() {
    let err = IndicatorEngine::default().compute(&rising_bars(10)).unwrap_err();
    assert_eq!(
        err,
        AnalyticsError::InsufficientData {
            indicator: "rsi",
            required: 15,
            available: 10,
        }
    );
}

// ── Scenario 2: medium-volatility hourly long ────────────────────────

#[test]
fn medium_hourly_long_levels() {
    let config = RiskConfig::default();
    let adj = config.adjustment(Timeframe::H1).unwrap();
    let levels = RiskFramework::new(config)
        .unwrap()
        .compute_levels(100.0, 2.0, Direction::Long, VolatilityTier::Medium, Timeframe::H1)
        .unwrap();

    let stop = 100.0 - 2.0 * 2.0 * adj;
    let take = 100.0 + 2.0 * 2.5 * adj;
    assert!((levels.stop_loss - stop).abs() < 1e-9);
    assert!((levels.take_profit - take).abs() < 1e-9);
    let ratio = (take - 100.0) / (100.0 - stop);
    assert!((levels.risk_reward_ratio - ratio).abs() < 1e-9);

    // 2.5 / 2.0 sits under the default 1.5 floor: reported, not dropped.
    assert!(!levels.actionable);
    assert!(levels.validate().is_err());
}

// ── Scenario 3: Kelly clamp under the hard cap ───────────────────────

#[test]
fn kelly_clamped_and_risk_capped_for_every_tier() {
    let sizer = PositionSizer::default();
    for tier in [VolatilityTier::Low, VolatilityTier::Medium, VolatilityTier::High] {
        for atr_pct in [0.2, 1.0, 2.0, 5.0, 12.0] {
            let sizing = sizer
                .size(&SizingRequest {
                    win_rate: 0.6,
                    avg_win: 200.0,
                    avg_loss: 100.0,
                    account_balance: 10_000.0,
                    volatility_tier: tier,
                    atr_percentage: atr_pct,
                    max_risk_fraction: None,
                })
                .unwrap();
            assert!((sizing.raw_kelly - 0.4).abs() < 1e-12);
            assert_eq!(sizing.kelly_fraction, 0.25);
            assert!(sizing.risk_percentage_of_account <= 5.0);
        }
    }
}

// ── Full chain ───────────────────────────────────────────────────────

#[test]
fn full_chain_from_bars_to_sizing() {
    let bars = rising_bars(40);
    let set = IndicatorEngine::default().compute(&bars).unwrap();
    let reading = VolatilityClassifier::default().classify(set.atr, set.close).unwrap();
    assert_eq!(reading.tier, VolatilityTier::Low);

    let signal = ConfluenceScorer::default()
        .score("ETHUSDT", Timeframe::H4, &set, &[], None)
        .unwrap();
    let levels = RiskFramework::default()
        .compute_levels(signal.entry_price, set.atr, signal.direction, reading.tier, signal.timeframe)
        .unwrap();
    assert!(levels.stop_loss < levels.entry_price && levels.entry_price < levels.take_profit);

    let sizing = PositionSizer::default()
        .size(&SizingRequest {
            win_rate: 0.55,
            avg_win: 150.0,
            avg_loss: 100.0,
            account_balance: 25_000.0,
            volatility_tier: reading.tier,
            atr_percentage: reading.atr_percentage,
            max_risk_fraction: Some(levels.max_risk_fraction),
        })
        .unwrap();
    assert!(!sizing.insufficient_statistics);
    assert!(sizing.risk_percentage_of_account <= 100.0 * levels.max_risk_fraction * 1.2 * 1.5 + 1e-9);
    assert!(sizing.risk_percentage_of_account <= 5.0);
}
