//! Kelly-criterion position sizing with volatility and risk caps.
//!
//! ```text
//! b      = avg_win / avg_loss
//! kelly  = clamp((b·p - q) / b, 0, kelly_cap)
//! base   = min(balance · kelly, balance · cap)      cap = min(max_risk_percent, tier cap)
//! risk   = base · vol_mult(tier) · clamp(2 / atr_pct, 0.5, 1.5)
//! risk% <= hard_cap_percent
//! ```
//!
//! Unusable statistics produce an explicit zero-size result flagged
//! `insufficient_statistics` rather than a guessed size. Levels below the
//! risk/reward floor size to zero as well, flagged `not_actionable`.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, AnalyticsError};
use crate::risk::RiskLevels;
use crate::stats::TradeStats;
use crate::volatility::VolatilityTier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub kelly_cap: f64,
    /// Percent of balance, e.g. 2.0.
    pub max_risk_percent: f64,
    /// Absolute ceiling after every multiplier, percent of balance.
    pub hard_cap_percent: f64,
    pub low_volatility_multiplier: f64,
    pub medium_volatility_multiplier: f64,
    pub high_volatility_multiplier: f64,
    /// ATR percentage at which the dampener is neutral.
    pub dampener_reference: f64,
    pub dampener_min: f64,
    pub dampener_max: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            kelly_cap: 0.25,
            max_risk_percent: 2.0,
            hard_cap_percent: 5.0,
            low_volatility_multiplier: 1.2,
            medium_volatility_multiplier: 1.0,
            high_volatility_multiplier: 0.7,
            dampener_reference: 2.0,
            dampener_min: 0.5,
            dampener_max: 1.5,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for (name, value) in [
            ("kelly_cap", self.kelly_cap),
            ("max_risk_percent", self.max_risk_percent),
            ("hard_cap_percent", self.hard_cap_percent),
            ("low_volatility_multiplier", self.low_volatility_multiplier),
            ("medium_volatility_multiplier", self.medium_volatility_multiplier),
            ("high_volatility_multiplier", self.high_volatility_multiplier),
            ("dampener_reference", self.dampener_reference),
            ("dampener_min", self.dampener_min),
            ("dampener_max", self.dampener_max),
        ] {
            ensure_finite(name, value)?;
            if value <= 0.0 {
                return Err(AnalyticsError::invalid(format!("{name} must be > 0")));
            }
        }
        if self.kelly_cap > 0.25 {
            return Err(AnalyticsError::invalid("kelly_cap must be <= 0.25"));
        }
        if self.hard_cap_percent > 5.0 {
            return Err(AnalyticsError::invalid("hard_cap_percent must be <= 5"));
        }
        if self.dampener_min > self.dampener_max {
            return Err(AnalyticsError::invalid("dampener_min must be <= dampener_max"));
        }
        Ok(())
    }

    fn volatility_multiplier(&self, tier: VolatilityTier) -> f64 {
        match tier {
            VolatilityTier::Low => self.low_volatility_multiplier,
            VolatilityTier::Medium => self.medium_volatility_multiplier,
            VolatilityTier::High => self.high_volatility_multiplier,
        }
    }
}

/// Inputs for one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub win_rate: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub account_balance: f64,
    pub volatility_tier: VolatilityTier,
    pub atr_percentage: f64,
    /// Per-tier risk fraction from the risk framework, if any.
    pub max_risk_fraction: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    /// Clamped Kelly fraction in [0, kelly_cap].
    pub kelly_fraction: f64,
    /// Kelly output before clamping, for diagnostics.
    pub raw_kelly: f64,
    /// Capital to commit, in account currency.
    pub recommended_size: f64,
    /// Amount lost if the stop is hit.
    pub risk_amount: f64,
    pub risk_percentage_of_account: f64,
    /// Quantity such that hitting the stop loses `risk_amount`; set when
    /// sized against concrete levels.
    pub units: Option<f64>,
    pub insufficient_statistics: bool,
    /// The levels sized against were below the risk/reward floor.
    #[serde(default)]
    pub not_actionable: bool,
}

impl PositionSizing {
    fn insufficient() -> Self {
        Self {
            kelly_fraction: 0.0,
            raw_kelly: 0.0,
            recommended_size: 0.0,
            risk_amount: 0.0,
            risk_percentage_of_account: 0.0,
            units: None,
            insufficient_statistics: true,
            not_actionable: false,
        }
    }

    /// Keep the Kelly diagnostics but commit nothing.
    fn rejected(self) -> Self {
        Self {
            recommended_size: 0.0,
            risk_amount: 0.0,
            risk_percentage_of_account: 0.0,
            units: None,
            not_actionable: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    pub fn size(&self, req: &SizingRequest) -> Result<PositionSizing, AnalyticsError> {
        let balance = ensure_finite("account_balance", req.account_balance)?;
        if balance <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "account balance must be > 0, got {balance}"
            )));
        }
        let atr_pct = ensure_finite("atr_percentage", req.atr_percentage)?;
        if atr_pct <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "atr percentage must be > 0, got {atr_pct}"
            )));
        }

        let stats_usable = [req.win_rate, req.avg_win, req.avg_loss]
            .iter()
            .all(|v| v.is_finite())
            && req.win_rate > 0.0
            && req.win_rate < 1.0
            && req.avg_win > 0.0
            && req.avg_loss > 0.0;
        if !stats_usable {
            tracing::debug!(
                win_rate = req.win_rate,
                avg_win = req.avg_win,
                avg_loss = req.avg_loss,
                "insufficient statistics for kelly sizing"
            );
            return Ok(PositionSizing::insufficient());
        }

        let c = &self.config;
        let p = req.win_rate;
        let q = 1.0 - p;
        let b = req.avg_win / req.avg_loss;
        let raw_kelly = (b * p - q) / b;
        let kelly_fraction = raw_kelly.clamp(0.0, c.kelly_cap);

        let mut cap_fraction = c.max_risk_percent / 100.0;
        if let Some(tier_cap) = req.max_risk_fraction.filter(|f| f.is_finite() && *f > 0.0) {
            cap_fraction = cap_fraction.min(tier_cap);
        }
        let base = (balance * kelly_fraction).min(balance * cap_fraction);

        let dampener = (c.dampener_reference / atr_pct).clamp(c.dampener_min, c.dampener_max);
        let adjusted = base * c.volatility_multiplier(req.volatility_tier) * dampener;
        let risk_percentage_of_account = (100.0 * adjusted / balance).min(c.hard_cap_percent);
        let risk_amount = balance * risk_percentage_of_account / 100.0;

        if !(0.0..=c.kelly_cap).contains(&kelly_fraction)
            || !(0.0..=c.hard_cap_percent).contains(&risk_percentage_of_account)
        {
            return Err(AnalyticsError::invariant(format!(
                "sizing bounds broken: kelly {kelly_fraction}, risk% {risk_percentage_of_account}"
            )));
        }

        Ok(PositionSizing {
            kelly_fraction,
            raw_kelly,
            recommended_size: risk_amount,
            risk_amount,
            risk_percentage_of_account,
            units: None,
            insufficient_statistics: false,
            not_actionable: false,
        })
    }

    /// Size from recorded outcomes against concrete risk levels.
    ///
    /// Missing stats count as insufficient. The tier cap comes from `levels`,
    /// and `units` is the quantity whose stop-out loses `risk_amount`.
    /// Levels that are not actionable size to zero.
    pub fn size_for_levels(
        &self,
        stats: Option<&TradeStats>,
        account_balance: f64,
        levels: &RiskLevels,
    ) -> Result<PositionSizing, AnalyticsError> {
        let (win_rate, avg_win, avg_loss) = match stats {
            Some(s) => (
                s.win_rate().unwrap_or(f64::NAN),
                s.avg_win().unwrap_or(f64::NAN),
                s.avg_loss().unwrap_or(f64::NAN),
            ),
            None => (f64::NAN, f64::NAN, f64::NAN),
        };
        let mut sizing = self.size(&SizingRequest {
            win_rate,
            avg_win,
            avg_loss,
            account_balance,
            volatility_tier: levels.volatility_tier,
            atr_percentage: levels.atr_percentage,
            max_risk_fraction: Some(levels.max_risk_fraction),
        })?;
        if !levels.actionable {
            tracing::debug!(
                ratio = levels.risk_reward_ratio,
                minimum = levels.min_risk_reward,
                "levels not actionable; sizing to zero"
            );
            return Ok(sizing.rejected());
        }

        let stop_distance = levels.stop_distance();
        if !sizing.insufficient_statistics && stop_distance > 0.0 {
            sizing.units = Some(sizing.risk_amount / stop_distance);
        }
        Ok(sizing)
    }
}
