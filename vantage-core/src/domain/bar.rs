//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// OHLCV bar for one symbol on one timeframe.
///
/// Bars in a series are ordered strictly ascending by `timestamp` and never
/// modified once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is not finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: high >= low, high >= open/close, low <= open/close,
    /// positive prices and non-negative volume.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }

    /// Like [`Bar::is_sane`], but reports which constraint failed.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.is_void() {
            return Err(AnalyticsError::invalid(format!(
                "bar at {} has non-finite fields",
                self.timestamp
            )));
        }
        if self.high < self.low {
            return Err(AnalyticsError::invalid(format!(
                "bar at {}: high {} below low {}",
                self.timestamp, self.high, self.low
            )));
        }
        if self.open > self.high || self.close > self.high {
            return Err(AnalyticsError::invalid(format!(
                "bar at {}: open/close above high",
                self.timestamp
            )));
        }
        if self.open < self.low || self.close < self.low {
            return Err(AnalyticsError::invalid(format!(
                "bar at {}: open/close below low",
                self.timestamp
            )));
        }
        if self.low <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "bar at {}: prices must be positive",
                self.timestamp
            )));
        }
        if self.volume < 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "bar at {}: negative volume {}",
                self.timestamp, self.volume
            )));
        }
        Ok(())
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Validate every bar and the strict ascending timestamp order of the series.
pub fn validate_series(bars: &[Bar]) -> Result<(), AnalyticsError> {
    for bar in bars {
        bar.validate()?;
    }
    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(AnalyticsError::invalid(format!(
                "timestamps not strictly ascending: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
        assert!(matches!(bar.validate(), Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(!bar.is_sane());
        assert!(bar.validate().is_err());
    }

    #[test]
    fn bar_rejects_negative_volume() {
        let mut bar = sample_bar();
        bar.volume = -1.0;
        assert!(bar.validate().is_err());
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let a = sample_bar();
        let b = sample_bar();
        assert!(validate_series(&[a, b]).is_err());
    }

    #[test]
    fn series_accepts_ascending() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.timestamp = a.timestamp + Duration::hours(1);
        assert!(validate_series(&[a, b]).is_ok());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
