//! Sentiment→price correlation with a lag scan.
//!
//! For a lag `L`, every sentiment sample at `t` is paired with the forward
//! return between the price closest to `t + L` and the price closest to
//! `t + L + horizon` (each within `alignment_window`). Pearson's r is taken
//! over the pairs. The lag with the largest `|r|` wins; ties go to the
//! shorter lag. Sentiment leads price when the winning lag is positive.
//!
//! Fewer than `min_samples` pairs at every lag yields an explicit
//! insufficient result (`correlation = 0`, `confidence_level = 0`).

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::history::SymbolHistory;
use super::{PriceTick, SentimentScore};
use crate::error::AnalyticsError;

// ─── Configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Offsets scanned, in minutes, shortest first.
    pub lags_minutes: Vec<i64>,
    /// Forward-return horizon in minutes.
    pub horizon_minutes: i64,
    /// Maximum distance between a target time and the price used for it.
    pub alignment_window_secs: i64,
    pub min_samples: usize,
    pub sentiment_capacity: usize,
    pub price_capacity: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            lags_minutes: vec![0, 5, 10, 15, 30],
            horizon_minutes: 15,
            alignment_window_secs: 150,
            min_samples: 20,
            sentiment_capacity: 1_000,
            price_capacity: 10_000,
        }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.lags_minutes.is_empty() {
            return Err(AnalyticsError::invalid("at least one lag is required"));
        }
        if self.lags_minutes.iter().any(|&l| l < 0) {
            return Err(AnalyticsError::invalid("lags must be >= 0"));
        }
        if self.lags_minutes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalyticsError::invalid("lags must be strictly increasing"));
        }
        if self.horizon_minutes <= 0 {
            return Err(AnalyticsError::invalid("horizon_minutes must be > 0"));
        }
        if self.alignment_window_secs < 0 {
            return Err(AnalyticsError::invalid("alignment_window_secs must be >= 0"));
        }
        if self.min_samples < 3 {
            return Err(AnalyticsError::invalid("min_samples must be >= 3"));
        }
        if self.sentiment_capacity == 0 || self.price_capacity == 0 {
            return Err(AnalyticsError::invalid("history capacities must be >= 1"));
        }
        Ok(())
    }
}

// ─── Results ────────────────────────────────────────────────────────

/// Correlation at one lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagCorrelation {
    pub lag_millis: i64,
    pub correlation: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub symbol: String,
    /// In [-1, 1]; 0 when insufficient.
    pub correlation: f64,
    pub is_leading_indicator: bool,
    pub optimal_lag_millis: i64,
    /// In [0, 1]; 0 when insufficient.
    pub confidence_level: f64,
    pub sample_size: usize,
    pub sufficient: bool,
    /// History revision the result was computed from.
    pub history_revision: u64,
    pub lag_scan: Vec<LagCorrelation>,
}

/// Pearson correlation coefficient, clamped to [-1, 1].
///
/// `None` for mismatched or too-short input, or when either series has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Per-symbol rolling histories plus the correlation computation.
///
/// Not internally synchronised: wrap it in a lock when shared.
#[derive(Debug, Clone)]
pub struct SentimentCorrelationEngine {
    config: CorrelationConfig,
    histories: HashMap<String, SymbolHistory>,
}

impl Default for SentimentCorrelationEngine {
    fn default() -> Self {
        Self {
            config: CorrelationConfig::default(),
            histories: HashMap::new(),
        }
    }
}

impl SentimentCorrelationEngine {
    pub fn new(config: CorrelationConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self {
            config,
            histories: HashMap::new(),
        })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    fn history_mut(&mut self, symbol: &str) -> &mut SymbolHistory {
        let (s, p) = (self.config.sentiment_capacity, self.config.price_capacity);
        self.histories
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolHistory::new(s, p))
    }

    /// Append a sentiment sample; returns the symbol's new revision.
    pub fn record_sentiment(&mut self, symbol: &str, score: SentimentScore) -> Result<u64, AnalyticsError> {
        self.history_mut(symbol).push_sentiment(score)
    }

    /// Append a price tick; returns the symbol's new revision.
    pub fn record_price(&mut self, symbol: &str, tick: PriceTick) -> Result<u64, AnalyticsError> {
        self.history_mut(symbol).push_price(tick)
    }

    pub fn history(&self, symbol: &str) -> Option<&SymbolHistory> {
        self.histories.get(symbol)
    }

    /// 0 for unknown symbols.
    pub fn revision(&self, symbol: &str) -> u64 {
        self.histories.get(symbol).map_or(0, SymbolHistory::revision)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }

    /// Correlate the symbol's sentiment with forward price returns.
    ///
    /// Pure over the current history: identical history, identical result.
    pub fn correlate(&self, symbol: &str) -> CorrelationResult {
        let Some(history) = self.histories.get(symbol) else {
            return self.insufficient(symbol, 0, 0, Vec::new());
        };

        let window = Duration::seconds(self.config.alignment_window_secs);
        let horizon = Duration::minutes(self.config.horizon_minutes);

        let mut scan = Vec::with_capacity(self.config.lags_minutes.len());
        let mut best: Option<LagCorrelation> = None;
        let mut max_samples = 0;

        for &lag_minutes in &self.config.lags_minutes {
            let lag = Duration::minutes(lag_minutes);
            let (xs, ys) = align(history, lag, horizon, window);
            let samples = xs.len();
            max_samples = max_samples.max(samples);

            let correlation = if samples >= self.config.min_samples {
                pearson(&xs, &ys).unwrap_or(0.0)
            } else {
                0.0
            };
            let entry = LagCorrelation {
                lag_millis: lag.num_milliseconds(),
                correlation,
                samples,
            };
            scan.push(entry);

            if samples >= self.config.min_samples
                && best.map_or(true, |b| correlation.abs() > b.correlation.abs())
            {
                best = Some(entry);
            }
        }

        let Some(best) = best else {
            tracing::debug!(symbol, max_samples, "not enough aligned samples for correlation");
            return self.insufficient(symbol, max_samples, history.revision(), scan);
        };

        let adequacy = (best.samples as f64 / (2 * self.config.min_samples) as f64).min(1.0);
        let confidence_level = (0.5 * adequacy + 0.5 * best.correlation.abs()).clamp(0.0, 1.0);

        CorrelationResult {
            symbol: symbol.to_string(),
            correlation: best.correlation,
            is_leading_indicator: best.lag_millis > 0,
            optimal_lag_millis: best.lag_millis,
            confidence_level,
            sample_size: best.samples,
            sufficient: true,
            history_revision: history.revision(),
            lag_scan: scan,
        }
    }

    fn insufficient(
        &self,
        symbol: &str,
        sample_size: usize,
        history_revision: u64,
        lag_scan: Vec<LagCorrelation>,
    ) -> CorrelationResult {
        CorrelationResult {
            symbol: symbol.to_string(),
            correlation: 0.0,
            is_leading_indicator: false,
            optimal_lag_millis: 0,
            confidence_level: 0.0,
            sample_size,
            sufficient: false,
            history_revision,
            lag_scan,
        }
    }
}

/// Pair each sentiment sample with the forward return at `lag`.
fn align(history: &SymbolHistory, lag: Duration, horizon: Duration, window: Duration) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for score in history.sentiment() {
        let start_at = score.timestamp + lag;
        let Some(start) = history.closest_price(start_at, window) else {
            continue;
        };
        let Some(end) = history.closest_price(start_at + horizon, window) else {
            continue;
        };
        if end.timestamp <= start.timestamp {
            continue;
        }
        xs.push(score.overall);
        ys.push(end.price / start.price - 1.0);
    }
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::score_at;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn sentiment_value(i: i64) -> f64 {
        // deterministic, non-periodic-looking values in [-0.9, 0.9]
        (((i * 37) % 19) as f64 - 9.0) / 10.0
    }

    /// Minute-by-minute prices. During the 15 minutes starting `lead` minutes
    /// after sample `i` the log price drifts by `s_i / 100`; every other minute
    /// carries deterministic noise. Only the lag equal to `lead` sees the
    /// drift without noise.
    fn engine_with_lead(lead: i64, samples: i64) -> SentimentCorrelationEngine {
        let mut engine = SentimentCorrelationEngine::default();
        let spacing = 60;
        for i in 0..samples {
            engine
                .record_sentiment("BTC", score_at(t(i * spacing), sentiment_value(i)))
                .unwrap();
        }
        let total = samples * spacing + 120;
        let mut log_price = 0.0;
        for m in 0..total {
            let price = 100.0 * f64::exp(log_price);
            engine.record_price("BTC", PriceTick { timestamp: t(m), price }).unwrap();
            let offset = m - lead;
            let i = offset.div_euclid(spacing);
            if offset >= 0 && offset % spacing < 15 && i < samples {
                log_price += sentiment_value(i) * 0.01 / 15.0;
            } else {
                log_price += (((m * 7919 + 13) % 29) as f64 - 14.0) / 14.0 * 0.003;
            }
        }
        engine
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_degenerate_inputs() {
        assert_eq!(pearson(&[1.0], &[1.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn unknown_symbol_is_insufficient() {
        let r = SentimentCorrelationEngine::default().correlate("NOPE");
        assert!(!r.sufficient);
        assert_eq!(r.correlation, 0.0);
        assert_eq!(r.confidence_level, 0.0);
    }

    #[test]
    fn too_few_samples_reports_zero() {
        let engine = engine_with_lead(0, 10);
        let r = engine.correlate("BTC");
        assert!(!r.sufficient);
        assert_eq!(r.correlation, 0.0);
        assert_eq!(r.confidence_level, 0.0);
        assert!(r.sample_size > 0 && r.sample_size < 20);
    }

    #[test]
    fn detects_leading_sentiment() {
        let engine = engine_with_lead(10, 40);
        let r = engine.correlate("BTC");
        assert!(r.sufficient);
        assert_eq!(r.optimal_lag_millis, 10 * 60 * 1000);
        assert!(r.is_leading_indicator);
        assert!(r.correlation > 0.99, "correlation {}", r.correlation);
        assert!((0.0..=1.0).contains(&r.confidence_level));
        assert_eq!(r.lag_scan.len(), 5);
    }

    #[test]
    fn coincident_sentiment_is_not_leading() {
        let engine = engine_with_lead(0, 40);
        let r = engine.correlate("BTC");
        assert!(r.sufficient);
        assert_eq!(r.optimal_lag_millis, 0);
        assert!(!r.is_leading_indicator);
    }

    #[test]
    fn confidence_combines_adequacy_and_magnitude() {
        let engine = engine_with_lead(0, 40);
        let r = engine.correlate("BTC");
        let adequacy = (r.sample_size as f64 / 40.0).min(1.0);
        assert!((r.confidence_level - (0.5 * adequacy + 0.5 * r.correlation.abs())).abs() < 1e-12);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let engine = engine_with_lead(5, 30);
        assert_eq!(engine.correlate("BTC"), engine.correlate("BTC"));
    }

    #[test]
    fn revision_tracks_appends() {
        let mut engine = SentimentCorrelationEngine::default();
        assert_eq!(engine.revision("ETH"), 0);
        engine.record_sentiment("ETH", score_at(t(0), 0.2)).unwrap();
        engine.record_price("ETH", PriceTick { timestamp: t(0), price: 10.0 }).unwrap();
        assert_eq!(engine.revision("ETH"), 2);
        assert!(engine.record_sentiment("ETH", score_at(t(-1), 0.2)).is_err());
        assert_eq!(engine.revision("ETH"), 2);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = CorrelationConfig {
            lags_minutes: vec![5, 0],
            ..CorrelationConfig::default()
        };
        assert!(SentimentCorrelationEngine::new(config).is_err());
    }
}
