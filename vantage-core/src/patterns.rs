//! Pattern findings consumed by the confluence scorer.
//!
//! Recognition itself lives outside this crate. A [`PatternSource`] hands the
//! scorer an opaque, possibly empty list of findings per symbol/timeframe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternStrength {
    Weak,
    Moderate,
    Strong,
}

impl PatternStrength {
    /// Contribution of one finding to the net pattern score.
    pub fn magnitude(&self) -> f64 {
        match self {
            PatternStrength::Weak => 1.0 / 3.0,
            PatternStrength::Moderate => 2.0 / 3.0,
            PatternStrength::Strong => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFinding {
    /// Detector-specific name, e.g. "bull_flag".
    pub pattern_type: String,
    /// Detector-specific grouping, e.g. "continuation".
    pub category: String,
    pub strength: PatternStrength,
    pub direction: Direction,
}

impl PatternFinding {
    pub fn new(
        pattern_type: impl Into<String>,
        category: impl Into<String>,
        strength: PatternStrength,
        direction: Direction,
    ) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            category: category.into(),
            strength,
            direction,
        }
    }
}

/// Net agreement of `findings` with `direction`, in [-1, 1].
///
/// Each finding contributes its strength magnitude, positive when it points
/// the same way, negative when it points the other way, zero when neutral.
/// The sum is divided by the finding count. Empty input or a neutral
/// direction scores 0.
pub fn net_agreement(findings: &[PatternFinding], direction: Direction) -> f64 {
    if findings.is_empty() || !direction.is_directional() {
        return 0.0;
    }
    let total: f64 = findings
        .iter()
        .map(|f| f.strength.magnitude() * f.direction.sign() * direction.sign())
        .sum();
    (total / findings.len() as f64).clamp(-1.0, 1.0)
}

/// Supplier of pattern findings.
pub trait PatternSource: Send + Sync {
    fn findings(&self, symbol: &str, timeframe: Timeframe) -> Vec<PatternFinding>;
}

/// No detector attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPatterns;

impl PatternSource for NoPatterns {
    fn findings(&self, _symbol: &str, _timeframe: Timeframe) -> Vec<PatternFinding> {
        Vec::new()
    }
}

/// Fixed findings per (symbol, timeframe). Useful for replay and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPatterns {
    findings: HashMap<(String, Timeframe), Vec<PatternFinding>>,
}

impl StaticPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, timeframe: Timeframe, finding: PatternFinding) {
        self.findings
            .entry((symbol.into(), timeframe))
            .or_default()
            .push(finding);
    }

    pub fn with(mut self, symbol: impl Into<String>, timeframe: Timeframe, finding: PatternFinding) -> Self {
        self.insert(symbol, timeframe, finding);
        self
    }
}

impl PatternSource for StaticPatterns {
    fn findings(&self, symbol: &str, timeframe: Timeframe) -> Vec<PatternFinding> {
        self.findings
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(strength: PatternStrength, direction: Direction) -> PatternFinding {
        PatternFinding::new("flag", "continuation", strength, direction)
    }

    #[test]
    fn empty_findings_score_zero() {
        assert_eq!(net_agreement(&[], Direction::Long), 0.0);
    }

    #[test]
    fn agreeing_strong_finding_scores_one() {
        let f = [finding(PatternStrength::Strong, Direction::Long)];
        assert!((net_agreement(&f, Direction::Long) - 1.0).abs() < 1e-12);
        assert!((net_agreement(&f, Direction::Short) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn mixed_findings_average_out() {
        let f = [
            finding(PatternStrength::Strong, Direction::Long),
            finding(PatternStrength::Strong, Direction::Short),
        ];
        assert_eq!(net_agreement(&f, Direction::Long), 0.0);
    }

    #[test]
    fn neutral_findings_and_direction_contribute_nothing() {
        let f = [finding(PatternStrength::Moderate, Direction::Neutral)];
        assert_eq!(net_agreement(&f, Direction::Long), 0.0);
        let g = [finding(PatternStrength::Strong, Direction::Long)];
        assert_eq!(net_agreement(&g, Direction::Neutral), 0.0);
    }

    #[test]
    fn static_patterns_lookup_by_key() {
        let src = StaticPatterns::new().with(
            "BTCUSDT",
            Timeframe::H1,
            finding(PatternStrength::Weak, Direction::Long),
        );
        assert_eq!(src.findings("BTCUSDT", Timeframe::H1).len(), 1);
        assert!(src.findings("BTCUSDT", Timeframe::H4).is_empty());
        assert!(src.findings("ETHUSDT", Timeframe::H1).is_empty());
        assert!(NoPatterns.findings("BTCUSDT", Timeframe::H1).is_empty());
    }
}
