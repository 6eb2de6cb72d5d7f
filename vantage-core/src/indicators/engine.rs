//! Indicator engine: one validated window in, one [`IndicatorSet`] snapshot out.

use serde::{Deserialize, Serialize};

use super::{Atr, Bollinger, Indicator, Macd, Rsi, Stochastic};
use crate::domain::{validate_series, Bar};
use crate::error::AnalyticsError;

/// Indicator periods. Defaults are the conventional 14 / 12-26-9 / 20x2 / 14 / 14-3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub atr_period: usize,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    /// Trailing window for volume confirmation.
    pub volume_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            atr_period: 14,
            stochastic_k: 14,
            stochastic_d: 3,
            volume_period: 20,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_signal", self.macd_signal),
            ("bollinger_period", self.bollinger_period),
            ("atr_period", self.atr_period),
            ("stochastic_k", self.stochastic_k),
            ("stochastic_d", self.stochastic_d),
            ("volume_period", self.volume_period),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(AnalyticsError::invalid(format!("{name} must be >= 1")));
            }
        }
        if self.macd_slow <= self.macd_fast {
            return Err(AnalyticsError::invalid(
                "macd_slow must be greater than macd_fast",
            ));
        }
        if !(self.bollinger_k.is_finite() && self.bollinger_k > 0.0) {
            return Err(AnalyticsError::invalid("bollinger_k must be positive"));
        }
        Ok(())
    }

    /// Minimum window length per indicator, in evaluation order.
    pub fn requirements(&self) -> [(&'static str, usize); 5] {
        [
            ("rsi", self.rsi_period + 1),
            ("atr", self.atr_period + 1),
            ("bollinger", self.bollinger_period),
            ("stochastic", self.stochastic_k + self.stochastic_d - 1),
            ("macd", self.macd_slow),
        ]
    }

    /// Shortest window that satisfies every indicator.
    pub fn required_bars(&self) -> usize {
        self.requirements()
            .iter()
            .map(|(_, n)| *n)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerValues {
    /// Close position inside the envelope: -1 at the lower band, +1 at the upper.
    pub fn position_of(&self, price: f64) -> f64 {
        let half_width = self.upper - self.middle;
        if half_width > 0.0 {
            ((price - self.middle) / half_width).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValues {
    pub k: f64,
    pub d: f64,
}

/// Indicator values at the last bar of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Last close in the window; the reference entry price.
    pub close: f64,
    pub rsi: f64,
    pub macd: MacdValues,
    pub bollinger: BollingerValues,
    pub atr: f64,
    pub stochastic: StochasticValues,
}

impl IndicatorSet {
    /// Verify the bounds every indicator set must satisfy.
    pub fn check_invariants(&self) -> Result<(), AnalyticsError> {
        let fields = [
            ("close", self.close),
            ("rsi", self.rsi),
            ("macd.line", self.macd.line),
            ("macd.signal", self.macd.signal),
            ("macd.histogram", self.macd.histogram),
            ("bollinger.upper", self.bollinger.upper),
            ("bollinger.middle", self.bollinger.middle),
            ("bollinger.lower", self.bollinger.lower),
            ("atr", self.atr),
            ("stochastic.k", self.stochastic.k),
            ("stochastic.d", self.stochastic.d),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(AnalyticsError::invariant(format!(
                    "{name} is not finite ({value})"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.rsi) {
            return Err(AnalyticsError::invariant(format!("rsi {} outside [0, 100]", self.rsi)));
        }
        if self.atr < 0.0 {
            return Err(AnalyticsError::invariant(format!("atr {} is negative", self.atr)));
        }
        for (name, value) in [("k", self.stochastic.k), ("d", self.stochastic.d)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AnalyticsError::invariant(format!(
                    "stochastic %{name} {value} outside [0, 100]"
                )));
            }
        }
        let bb = &self.bollinger;
        if !(bb.lower < bb.middle && bb.middle < bb.upper) {
            return Err(AnalyticsError::invariant(format!(
                "bollinger ordering broken: lower {} middle {} upper {}",
                bb.lower, bb.middle, bb.upper
            )));
        }
        Ok(())
    }
}

/// Computes [`IndicatorSet`] snapshots. Stateless and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            config: IndicatorConfig::default(),
        }
    }
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Fail with `InsufficientData` naming the first indicator the window cannot feed.
    pub fn check_length(&self, available: usize) -> Result<(), AnalyticsError> {
        for (indicator, required) in self.config.requirements() {
            if available < required {
                return Err(AnalyticsError::InsufficientData {
                    indicator,
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Compute the indicator snapshot at the last bar of `bars`.
    pub fn compute(&self, bars: &[Bar]) -> Result<IndicatorSet, AnalyticsError> {
        self.check_length(bars.len())?;
        validate_series(bars)?;

        let c = &self.config;
        let last = |indicator: &dyn Indicator| last_value(indicator, bars);

        let bollinger = BollingerValues {
            upper: last(&Bollinger::upper(c.bollinger_period, c.bollinger_k))?,
            middle: last(&Bollinger::middle(c.bollinger_period, c.bollinger_k))?,
            lower: last(&Bollinger::lower(c.bollinger_period, c.bollinger_k))?,
        };
        // A near-flat window can round a band onto the middle.
        if !(bollinger.lower < bollinger.middle && bollinger.middle < bollinger.upper) {
            return Err(AnalyticsError::invalid(format!(
                "closes (near) constant over the last {} bars; bollinger bands are degenerate",
                c.bollinger_period
            )));
        }

        let set = IndicatorSet {
            close: bars[bars.len() - 1].close,
            rsi: last(&Rsi::new(c.rsi_period))?,
            macd: MacdValues {
                line: last(&Macd::line(c.macd_fast, c.macd_slow, c.macd_signal))?,
                signal: last(&Macd::signal(c.macd_fast, c.macd_slow, c.macd_signal))?,
                histogram: last(&Macd::histogram(c.macd_fast, c.macd_slow, c.macd_signal))?,
            },
            bollinger,
            atr: last(&Atr::new(c.atr_period))?,
            stochastic: StochasticValues {
                k: last(&Stochastic::k(c.stochastic_k, c.stochastic_d))?,
                d: last(&Stochastic::d(c.stochastic_k, c.stochastic_d))?,
            },
        };

        set.check_invariants()?;
        tracing::trace!(rsi = set.rsi, atr = set.atr, "indicator snapshot computed");
        Ok(set)
    }
}

fn last_value(indicator: &dyn Indicator, bars: &[Bar]) -> Result<f64, AnalyticsError> {
    let series = indicator.compute(bars);
    match series.last() {
        Some(v) if v.is_finite() => Ok(*v),
        other => Err(AnalyticsError::invariant(format!(
            "{} produced no value on a sufficient window ({other:?})",
            indicator.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.4).sin() * 4.0 + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn default_requires_26_bars() {
        assert_eq!(IndicatorConfig::default().required_bars(), 26);
    }

    #[test]
    fn ten_bars_fail_on_rsi() {
        let engine = IndicatorEngine::default();
        let bars = make_bars(&wave(10));
        assert_eq!(
            engine.compute(&bars),
            Err(AnalyticsError::InsufficientData {
                indicator: "rsi",
                required: 15,
                available: 10,
            })
        );
    }

    #[test]
    fn twenty_bars_fail_on_macd() {
        let engine = IndicatorEngine::default();
        let bars = make_bars(&wave(20));
        assert!(matches!(
            engine.compute(&bars),
            Err(AnalyticsError::InsufficientData { indicator: "macd", .. })
        ));
    }

    #[test]
    fn snapshot_satisfies_invariants() {
        let engine = IndicatorEngine::default();
        let bars = make_bars(&wave(60));
        let set = engine.compute(&bars).unwrap();
        assert!(set.check_invariants().is_ok());
        assert_eq!(set.close, bars[59].close);
    }

    #[test]
    fn snapshot_is_deterministic() {
        let engine = IndicatorEngine::default();
        let bars = make_bars(&wave(60));
        let a = engine.compute(&bars).unwrap();
        let b = engine.compute(&bars).unwrap();
        assert_eq!(a.rsi.to_bits(), b.rsi.to_bits());
        assert_eq!(a.macd.histogram.to_bits(), b.macd.histogram.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_bar_rejected() {
        let engine = IndicatorEngine::default();
        let mut bars = make_bars(&wave(40));
        bars[5].high = bars[5].low - 1.0;
        assert!(matches!(engine.compute(&bars), Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn constant_window_is_rejected_not_faked() {
        let engine = IndicatorEngine::default();
        let bars = make_bars(&[100.0; 40]);
        assert!(matches!(engine.compute(&bars), Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn near_flat_window_is_invalid_input() {
        let engine = IndicatorEngine::default();
        let mut closes = vec![64.0; 40];
        // One ulp above 64 rounds a band onto the middle.
        closes[39] = f64::from_bits(64.0_f64.to_bits() + 1);
        let err = engine.compute(&make_bars(&closes)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(_)), "{err:?}");
        assert!(!err.is_fatal());
    }

    #[test]
    fn bad_config_rejected() {
        let config = IndicatorConfig {
            macd_slow: 5,
            macd_fast: 12,
            ..IndicatorConfig::default()
        };
        assert!(IndicatorEngine::new(config).is_err());
    }

    #[test]
    fn broken_bollinger_order_is_fatal() {
        let engine = IndicatorEngine::default();
        let mut set = engine.compute(&make_bars(&wave(60))).unwrap();
        set.bollinger.lower = set.bollinger.upper + 1.0;
        let err = set.check_invariants().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn bollinger_position() {
        let bb = BollingerValues {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert_eq!(bb.position_of(105.0), 0.5);
        assert_eq!(bb.position_of(130.0), 1.0);
        assert_eq!(bb.position_of(90.0), -1.0);
    }
}
