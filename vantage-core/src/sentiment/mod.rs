//! Sentiment samples, price ticks and the sentiment→price correlation engine.

pub mod correlation;
pub mod history;

pub use correlation::{
    pearson, CorrelationConfig, CorrelationResult, LagCorrelation, SentimentCorrelationEngine,
};
pub use history::SymbolHistory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, AnalyticsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentTrend {
    /// Scores beyond ±0.1 lean bullish/bearish.
    pub fn from_overall(overall: f64) -> Self {
        if overall > 0.1 {
            SentimentTrend::Bullish
        } else if overall < -0.1 {
            SentimentTrend::Bearish
        } else {
            SentimentTrend::Neutral
        }
    }
}

impl fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentTrend::Bullish => "bullish",
            SentimentTrend::Bearish => "bearish",
            SentimentTrend::Neutral => "neutral",
        })
    }
}

/// One aggregated sentiment observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// Combined score in [-1, 1].
    pub overall: f64,
    pub news: f64,
    pub social: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub source_count: u32,
    pub trend: SentimentTrend,
    pub timestamp: DateTime<Utc>,
}

impl SentimentScore {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for (name, value) in [
            ("overall", self.overall),
            ("news", self.news),
            ("social", self.social),
        ] {
            ensure_finite(name, value)?;
            if !(-1.0..=1.0).contains(&value) {
                return Err(AnalyticsError::invalid(format!(
                    "sentiment {name} {value} outside [-1, 1]"
                )));
            }
        }
        ensure_finite("confidence", self.confidence)?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AnalyticsError::invalid(format!(
                "sentiment confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// A raw traded price at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceTick {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        ensure_finite("price", self.price)?;
        if self.price <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "price at {} must be > 0, got {}",
                self.timestamp, self.price
            )));
        }
        Ok(())
    }
}

/// Supplier of sentiment samples, polled on its own cadence.
///
/// Samples for one symbol must come back with non-decreasing timestamps.
pub trait SentimentFeed: Send + Sync {
    fn poll(&self, symbol: &str) -> Result<Vec<SentimentScore>, AnalyticsError>;
}

#[cfg(test)]
pub(crate) fn score_at(timestamp: DateTime<Utc>, overall: f64) -> SentimentScore {
    SentimentScore {
        overall,
        news: overall,
        social: overall,
        confidence: 0.8,
        source_count: 3,
        trend: SentimentTrend::from_overall(overall),
        timestamp,
    }
}
