//! Versioned per-timeframe category weights for the confluence scorer.
//!
//! Short timeframes lean on momentum, long timeframes on trend. The table is
//! plain configuration: it is passed into the scorer by value, carries a
//! version number, and can be fingerprinted so a signal can be traced to the
//! exact weights that produced it.

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;
use crate::error::{ensure_finite, AnalyticsError};

/// Relative weight per vote category. Only ratios matter; the scorer
/// normalises by the sum of the categories it actually uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volume: f64,
    /// Scales the pattern confidence multiplier; not a vote weight.
    pub pattern: f64,
}

impl CategoryWeights {
    pub const fn new(trend: f64, momentum: f64, volume: f64, pattern: f64) -> Self {
        Self {
            trend,
            momentum,
            volume,
            pattern,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for (name, value) in [
            ("trend", self.trend),
            ("momentum", self.momentum),
            ("volume", self.volume),
            ("pattern", self.pattern),
        ] {
            ensure_finite(name, value)?;
            if value < 0.0 {
                return Err(AnalyticsError::invalid(format!(
                    "category weight {name} must be >= 0, got {value}"
                )));
            }
        }
        if self.trend + self.momentum <= 0.0 {
            return Err(AnalyticsError::invalid(
                "trend and momentum weights cannot both be zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub timeframe: Timeframe,
    pub weights: CategoryWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub version: u64,
    pub rows: Vec<WeightRow>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let rows = [
            (Timeframe::M1, CategoryWeights::new(0.20, 0.45, 0.20, 0.15)),
            (Timeframe::M5, CategoryWeights::new(0.25, 0.40, 0.20, 0.15)),
            (Timeframe::M15, CategoryWeights::new(0.30, 0.35, 0.20, 0.15)),
            (Timeframe::M30, CategoryWeights::new(0.30, 0.30, 0.20, 0.20)),
            (Timeframe::H1, CategoryWeights::new(0.35, 0.30, 0.15, 0.20)),
            (Timeframe::H4, CategoryWeights::new(0.40, 0.25, 0.15, 0.20)),
            (Timeframe::D1, CategoryWeights::new(0.45, 0.20, 0.15, 0.20)),
            (Timeframe::W1, CategoryWeights::new(0.50, 0.15, 0.15, 0.20)),
            (Timeframe::Mo1, CategoryWeights::new(0.50, 0.15, 0.15, 0.20)),
        ]
        .into_iter()
        .map(|(timeframe, weights)| WeightRow { timeframe, weights })
        .collect();
        Self { version: 1, rows }
    }
}

impl WeightTable {
    /// Every timeframe present exactly once, every row valid.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for tf in Timeframe::ALL {
            let count = self.rows.iter().filter(|r| r.timeframe == tf).count();
            if count != 1 {
                return Err(AnalyticsError::invalid(format!(
                    "weight table v{} has {count} rows for timeframe {tf}, expected 1",
                    self.version
                )));
            }
        }
        for row in &self.rows {
            row.weights.validate()?;
        }
        Ok(())
    }

    pub fn weights_for(&self, timeframe: Timeframe) -> Option<&CategoryWeights> {
        self.rows
            .iter()
            .find(|r| r.timeframe == timeframe)
            .map(|r| &r.weights)
    }

    /// Replace one row and bump the version. The caller validates afterwards.
    pub fn with_row(mut self, timeframe: Timeframe, weights: CategoryWeights) -> Self {
        match self.rows.iter_mut().find(|r| r.timeframe == timeframe) {
            Some(row) => row.weights = weights,
            None => self.rows.push(WeightRow { timeframe, weights }),
        }
        self.version += 1;
        self
    }

    /// BLAKE3 hex digest over the version and rows in timeframe order.
    ///
    /// Bit patterns are hashed, so any change in any weight changes the digest.
    pub fn fingerprint(&self) -> String {
        let mut rows: Vec<&WeightRow> = self.rows.iter().collect();
        rows.sort_by_key(|r| r.timeframe);

        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.version.to_le_bytes());
        for row in rows {
            let w = &row.weights;
            hasher.update(row.timeframe.as_str().as_bytes());
            for value in [w.trend, w.momentum, w.volume, w.pattern] {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
