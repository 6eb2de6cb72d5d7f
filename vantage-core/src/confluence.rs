//! Confluence scoring: indicator votes + pattern agreement → one directional signal.
//!
//! Each category casts a vote in [-1, 1] (bearish to bullish):
//!
//! - trend: MACD histogram measured in quarter-ATRs, averaged with the close
//!   position inside the Bollinger envelope
//! - momentum: RSI around 50, averaged with a Stochastic vote (%K around 50
//!   plus %K over %D)
//! - volume: price direction scaled by how far volume sits above its mean
//!
//! `confluence = Σ(vote · w) / Σ(w)` using the weights for the signal's
//! timeframe; the volume category only enters when a confirmation is supplied.
//! Pattern findings are not a vote. Their net agreement with the signal
//! direction scales confidence:
//!
//! ```text
//! multiplier = clamp(1 + w_pattern · net_agreement, 0.5, 1.5)
//! confidence = clamp((50 + 50·|confluence|) · multiplier, 0, 100)
//! ```
//!
//! Nothing in the score depends on the symbol or timeframe names beyond the
//! timeframe's weight row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Timeframe};
use crate::error::{ensure_finite, AnalyticsError};
use crate::indicators::{IndicatorSet, VolumeConfirmation};
use crate::patterns::{net_agreement, PatternFinding};
use crate::weights::{CategoryWeights, WeightTable};

// ─── Configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// `|confluence|` below this is NEUTRAL.
    pub neutral_threshold: f64,
    /// MACD histogram divided by `atr * histogram_atr_scale` saturates at ±1.
    pub histogram_atr_scale: f64,
    /// %K - %D spread (in points) that saturates the crossover vote.
    pub stochastic_spread_scale: f64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            neutral_threshold: 0.1,
            histogram_atr_scale: 0.25,
            stochastic_spread_scale: 25.0,
        }
    }
}

impl ConfluenceConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        ensure_finite("neutral_threshold", self.neutral_threshold)?;
        if !(0.0..1.0).contains(&self.neutral_threshold) {
            return Err(AnalyticsError::invalid("neutral_threshold must be in [0, 1)"));
        }
        for (name, value) in [
            ("histogram_atr_scale", self.histogram_atr_scale),
            ("stochastic_spread_scale", self.stochastic_spread_scale),
        ] {
            ensure_finite(name, value)?;
            if value <= 0.0 {
                return Err(AnalyticsError::invalid(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

// ─── Output ─────────────────────────────────────────────────────────

/// Per-category votes behind a signal. `volume` is `None` when no
/// confirmation was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryVotes {
    pub trend: f64,
    pub momentum: f64,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    /// In [0, 100].
    pub confidence: f64,
    /// Weighted vote average in [-1, 1].
    pub confluence: f64,
    pub entry_price: f64,
    pub indicators: IndicatorSet,
    pub votes: CategoryVotes,
    /// Multiplier applied to confidence by pattern agreement, in [0.5, 1.5].
    pub pattern_contribution: f64,
    pub weights_version: u64,
}

/// Symbol-free result of scoring one set of inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub direction: Direction,
    pub confidence: f64,
    pub confluence: f64,
    pub votes: CategoryVotes,
    pub pattern_multiplier: f64,
}

// ─── Scorer ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfluenceScorer {
    config: ConfluenceConfig,
    weights: Arc<WeightTable>,
}

impl Default for ConfluenceScorer {
    fn default() -> Self {
        Self {
            config: ConfluenceConfig::default(),
            weights: Arc::new(WeightTable::default()),
        }
    }
}

impl ConfluenceScorer {
    pub fn new(config: ConfluenceConfig, weights: Arc<WeightTable>) -> Result<Self, AnalyticsError> {
        config.validate()?;
        weights.validate()?;
        Ok(Self { config, weights })
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Score one closed-bar snapshot into a [`Signal`].
    pub fn score(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        indicators: &IndicatorSet,
        patterns: &[PatternFinding],
        volume: Option<&VolumeConfirmation>,
    ) -> Result<Signal, AnalyticsError> {
        let weights = self.weights.weights_for(timeframe).ok_or_else(|| {
            AnalyticsError::invalid(format!(
                "weight table v{} has no row for {timeframe}",
                self.weights.version
            ))
        })?;
        let eval = self.evaluate(weights, indicators, patterns, volume)?;

        tracing::debug!(
            symbol,
            %timeframe,
            direction = %eval.direction,
            confidence = eval.confidence,
            confluence = eval.confluence,
            "signal scored"
        );

        Ok(Signal {
            symbol: symbol.to_string(),
            timeframe,
            direction: eval.direction,
            confidence: eval.confidence,
            confluence: eval.confluence,
            entry_price: indicators.close,
            indicators: *indicators,
            votes: eval.votes,
            pattern_contribution: eval.pattern_multiplier,
            weights_version: self.weights.version,
        })
    }

    /// Pure scoring against an explicit weight row.
    pub fn evaluate(
        &self,
        weights: &CategoryWeights,
        indicators: &IndicatorSet,
        patterns: &[PatternFinding],
        volume: Option<&VolumeConfirmation>,
    ) -> Result<Evaluation, AnalyticsError> {
        indicators.check_invariants()?;

        let votes = CategoryVotes {
            trend: self.trend_vote(indicators),
            momentum: self.momentum_vote(indicators),
            volume: volume.map(VolumeConfirmation::vote),
        };

        let mut weighted = votes.trend * weights.trend + votes.momentum * weights.momentum;
        let mut total = weights.trend + weights.momentum;
        if let Some(v) = votes.volume {
            weighted += v * weights.volume;
            total += weights.volume;
        }
        let confluence = (weighted / total).clamp(-1.0, 1.0);

        let direction = if confluence.abs() < self.config.neutral_threshold {
            Direction::Neutral
        } else if confluence > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };

        // Agreement is judged against the leaning even when it is too weak to trade.
        let leaning = if confluence > 0.0 {
            Direction::Long
        } else if confluence < 0.0 {
            Direction::Short
        } else {
            Direction::Neutral
        };
        let pattern_multiplier =
            (1.0 + weights.pattern * net_agreement(patterns, leaning)).clamp(0.5, 1.5);

        let confidence = ((50.0 + 50.0 * confluence.abs()) * pattern_multiplier).clamp(0.0, 100.0);
        if !confidence.is_finite() {
            return Err(AnalyticsError::invariant(format!(
                "confidence is not finite (confluence {confluence}, multiplier {pattern_multiplier})"
            )));
        }

        Ok(Evaluation {
            direction,
            confidence,
            confluence,
            votes,
            pattern_multiplier,
        })
    }

    fn trend_vote(&self, ind: &IndicatorSet) -> f64 {
        let scale = ind.atr * self.config.histogram_atr_scale;
        let macd = if scale > 0.0 {
            (ind.macd.histogram / scale).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let band = ind.bollinger.position_of(ind.close);
        0.5 * macd + 0.5 * band
    }

    fn momentum_vote(&self, ind: &IndicatorSet) -> f64 {
        let rsi = (ind.rsi - 50.0) / 50.0;
        let level = (ind.stochastic.k - 50.0) / 50.0;
        let cross = ((ind.stochastic.k - ind.stochastic.d) / self.config.stochastic_spread_scale)
            .clamp(-1.0, 1.0);
        let stochastic = 0.5 * level + 0.5 * cross;
        (0.5 * rsi + 0.5 * stochastic).clamp(-1.0, 1.0)
    }
}
