//! Volatility tier classification from ATR as a percentage of price.
//!
//! `atr_pct = 100 * atr / price`: below `low_below` → Low, above `high_above`
//! → High, otherwise Medium (both boundaries inclusive in Medium).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, AnalyticsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolatilityTier::Low => "LOW",
            VolatilityTier::Medium => "MEDIUM",
            VolatilityTier::High => "HIGH",
        })
    }
}

/// Tier boundaries in percent of price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityThresholds {
    pub low_below: f64,
    pub high_above: f64,
}

impl Default for VolatilityThresholds {
    fn default() -> Self {
        Self {
            low_below: 1.5,
            high_above: 3.0,
        }
    }
}

impl VolatilityThresholds {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        ensure_finite("low_below", self.low_below)?;
        ensure_finite("high_above", self.high_above)?;
        if self.low_below <= 0.0 || self.high_above < self.low_below {
            return Err(AnalyticsError::invalid(
                "volatility thresholds must satisfy 0 < low_below <= high_above",
            ));
        }
        Ok(())
    }
}

/// A classified volatility reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub tier: VolatilityTier,
    pub atr_percentage: f64,
}

/// Pure, total tier classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityClassifier {
    thresholds: VolatilityThresholds,
}

impl VolatilityClassifier {
    pub fn new(thresholds: VolatilityThresholds) -> Result<Self, AnalyticsError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &VolatilityThresholds {
        &self.thresholds
    }

    pub fn classify(&self, atr: f64, price: f64) -> Result<VolatilityReading, AnalyticsError> {
        ensure_finite("atr", atr)?;
        ensure_finite("price", price)?;
        if atr < 0.0 {
            return Err(AnalyticsError::invalid(format!("atr must be >= 0, got {atr}")));
        }
        if price <= 0.0 {
            return Err(AnalyticsError::invalid(format!("price must be > 0, got {price}")));
        }

        let atr_percentage = 100.0 * atr / price;
        Ok(VolatilityReading {
            tier: self.tier_for(atr_percentage),
            atr_percentage,
        })
    }

    pub fn tier_for(&self, atr_percentage: f64) -> VolatilityTier {
        if atr_percentage < self.thresholds.low_below {
            VolatilityTier::Low
        } else if atr_percentage > self.thresholds.high_above {
            VolatilityTier::High
        } else {
            VolatilityTier::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_from_percentages() {
        let c = VolatilityClassifier::default();
        assert_eq!(c.classify(1.0, 100.0).unwrap().tier, VolatilityTier::Low);
        assert_eq!(c.classify(2.0, 100.0).unwrap().tier, VolatilityTier::Medium);
        assert_eq!(c.classify(4.0, 100.0).unwrap().tier, VolatilityTier::High);
    }

    #[test]
    fn boundaries_are_medium() {
        let c = VolatilityClassifier::default();
        assert_eq!(c.tier_for(1.5), VolatilityTier::Medium);
        assert_eq!(c.tier_for(3.0), VolatilityTier::Medium);
        assert_eq!(c.tier_for(1.4999), VolatilityTier::Low);
        assert_eq!(c.tier_for(3.0001), VolatilityTier::High);
    }

    #[test]
    fn reading_carries_percentage() {
        let r = VolatilityClassifier::default().classify(250.0, 50_000.0).unwrap();
        assert!((r.atr_percentage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_and_non_positive_rejected() {
        let c = VolatilityClassifier::default();
        assert!(c.classify(f64::NAN, 100.0).is_err());
        assert!(c.classify(1.0, f64::INFINITY).is_err());
        assert!(c.classify(1.0, 0.0).is_err());
        assert!(c.classify(-1.0, 100.0).is_err());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let t = VolatilityThresholds {
            low_below: 3.0,
            high_above: 1.0,
        };
        assert!(VolatilityClassifier::new(t).is_err());
    }
}
