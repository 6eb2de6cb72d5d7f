//! Volatility-adaptive stop-loss / take-profit levels.
//!
//! ```text
//! stop = entry - dir · atr · stop_mult · tf_adj
//! take = entry + dir · atr · tp_mult   · tf_adj
//! rr   = |take - entry| / |entry - stop|
//! ```
//!
//! Tier multipliers and timeframe adjustments are configuration. Levels whose
//! risk/reward falls below `min_risk_reward` are still returned, flagged
//! `actionable = false`, so callers can report them instead of dropping them.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Timeframe};
use crate::error::{ensure_finite, AnalyticsError};
use crate::volatility::VolatilityTier;

// ─── Configuration ──────────────────────────────────────────────────

/// Per-tier `(stop multiplier, take-profit multiplier, max risk fraction)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierParameters {
    pub stop_multiplier: f64,
    pub take_profit_multiplier: f64,
    /// Fraction of the account, e.g. 0.02 for 2%.
    pub max_risk_fraction: f64,
}

impl TierParameters {
    pub const fn new(stop_multiplier: f64, take_profit_multiplier: f64, max_risk_fraction: f64) -> Self {
        Self {
            stop_multiplier,
            take_profit_multiplier,
            max_risk_fraction,
        }
    }

    fn validate(&self, tier: &str) -> Result<(), AnalyticsError> {
        for (name, value) in [
            ("stop_multiplier", self.stop_multiplier),
            ("take_profit_multiplier", self.take_profit_multiplier),
            ("max_risk_fraction", self.max_risk_fraction),
        ] {
            ensure_finite(name, value)?;
            if value <= 0.0 {
                return Err(AnalyticsError::invalid(format!("{tier}.{name} must be > 0")));
            }
        }
        if self.max_risk_fraction > 1.0 {
            return Err(AnalyticsError::invalid(format!(
                "{tier}.max_risk_fraction must be <= 1"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAdjustment {
    pub timeframe: Timeframe,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub min_risk_reward: f64,
    pub low: TierParameters,
    pub medium: TierParameters,
    pub high: TierParameters,
    /// Must increase with timeframe duration.
    pub timeframe_adjustments: Vec<TimeframeAdjustment>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let timeframe_adjustments = [
            (Timeframe::M1, 0.6),
            (Timeframe::M5, 0.7),
            (Timeframe::M15, 0.8),
            (Timeframe::M30, 0.9),
            (Timeframe::H1, 1.0),
            (Timeframe::H4, 1.15),
            (Timeframe::D1, 1.3),
            (Timeframe::W1, 1.4),
            (Timeframe::Mo1, 1.5),
        ]
        .into_iter()
        .map(|(timeframe, factor)| TimeframeAdjustment { timeframe, factor })
        .collect();

        Self {
            min_risk_reward: 1.5,
            low: TierParameters::new(1.5, 2.0, 0.02),
            medium: TierParameters::new(2.0, 2.5, 0.015),
            high: TierParameters::new(2.5, 3.0, 0.01),
            timeframe_adjustments,
        }
    }
}

impl RiskConfig {
    pub fn tier(&self, tier: VolatilityTier) -> &TierParameters {
        match tier {
            VolatilityTier::Low => &self.low,
            VolatilityTier::Medium => &self.medium,
            VolatilityTier::High => &self.high,
        }
    }

    pub fn adjustment(&self, timeframe: Timeframe) -> Option<f64> {
        self.timeframe_adjustments
            .iter()
            .find(|a| a.timeframe == timeframe)
            .map(|a| a.factor)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.low.validate("low")?;
        self.medium.validate("medium")?;
        self.high.validate("high")?;
        ensure_finite("min_risk_reward", self.min_risk_reward)?;
        if self.min_risk_reward < 0.0 {
            return Err(AnalyticsError::invalid("min_risk_reward must be >= 0"));
        }

        let mut prev: Option<f64> = None;
        for tf in Timeframe::ALL {
            let factor = self.adjustment(tf).ok_or_else(|| {
                AnalyticsError::invalid(format!("no timeframe adjustment for {tf}"))
            })?;
            ensure_finite("timeframe adjustment", factor)?;
            if factor <= 0.0 {
                return Err(AnalyticsError::invalid(format!(
                    "timeframe adjustment for {tf} must be > 0"
                )));
            }
            if prev.is_some_and(|p| factor < p) {
                return Err(AnalyticsError::invalid(format!(
                    "timeframe adjustment for {tf} ({factor}) decreases with duration"
                )));
            }
            prev = Some(factor);
        }
        Ok(())
    }
}

// ─── Levels ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: f64,
    pub volatility_tier: VolatilityTier,
    pub atr_percentage: f64,
    pub max_risk_fraction: f64,
    /// `risk_reward_ratio >= min_risk_reward` at computation time.
    pub actionable: bool,
    pub min_risk_reward: f64,
}

impl RiskLevels {
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn target_distance(&self) -> f64 {
        (self.take_profit - self.entry_price).abs()
    }

    /// Err(`NotActionable`) when the levels fall under the risk/reward floor.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.actionable {
            Ok(())
        } else {
            Err(AnalyticsError::NotActionable {
                ratio: self.risk_reward_ratio,
                minimum: self.min_risk_reward,
            })
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskFramework {
    config: RiskConfig,
}

impl RiskFramework {
    pub fn new(config: RiskConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn compute_levels(
        &self,
        entry: f64,
        atr: f64,
        direction: Direction,
        tier: VolatilityTier,
        timeframe: Timeframe,
    ) -> Result<RiskLevels, AnalyticsError> {
        ensure_finite("entry", entry)?;
        ensure_finite("atr", atr)?;
        if !direction.is_directional() {
            return Err(AnalyticsError::invalid("cannot compute risk levels for a NEUTRAL signal"));
        }
        if entry <= 0.0 {
            return Err(AnalyticsError::invalid(format!("entry must be > 0, got {entry}")));
        }
        if atr <= 0.0 {
            return Err(AnalyticsError::invalid(format!("atr must be > 0, got {atr}")));
        }

        let params = self.config.tier(tier);
        let adj = self.config.adjustment(timeframe).ok_or_else(|| {
            AnalyticsError::invalid(format!("no timeframe adjustment for {timeframe}"))
        })?;
        let sign = direction.sign();

        let stop_loss = entry - sign * atr * params.stop_multiplier * adj;
        let take_profit = entry + sign * atr * params.take_profit_multiplier * adj;
        if stop_loss <= 0.0 || take_profit <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "atr {atr} too large for entry {entry}: levels cross zero"
            )));
        }

        let risk = sign * (entry - stop_loss);
        let reward = sign * (take_profit - entry);
        if !(risk > 0.0 && reward > 0.0) {
            return Err(AnalyticsError::invariant(format!(
                "{direction} levels on the wrong side of entry {entry}: stop {stop_loss}, take {take_profit}"
            )));
        }
        let risk_reward_ratio = reward / risk;
        if !risk_reward_ratio.is_finite() || risk_reward_ratio < 0.0 {
            return Err(AnalyticsError::invariant(format!(
                "risk/reward undefined: reward {reward}, risk {risk}"
            )));
        }

        let actionable = risk_reward_ratio >= self.config.min_risk_reward;
        if !actionable {
            tracing::warn!(
                %direction,
                ratio = risk_reward_ratio,
                minimum = self.config.min_risk_reward,
                "risk levels below actionable risk/reward"
            );
        }

        Ok(RiskLevels {
            direction,
            entry_price: entry,
            stop_loss,
            take_profit,
            risk_reward_ratio,
            volatility_tier: tier,
            atr_percentage: 100.0 * atr / entry,
            max_risk_fraction: params.max_risk_fraction,
            actionable,
            min_risk_reward: self.config.min_risk_reward,
        })
    }
}
