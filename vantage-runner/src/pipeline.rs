//! End-to-end signal generation for one (symbol, timeframe) window.
//!
//! ```text
//! bars → indicators → volatility tier → confluence signal
//!      → risk levels → position sizing
//!      + cached Monte Carlo simulation + sentiment correlation
//! ```
//!
//! Indicator, scoring, risk-level and sizing failures fail the whole report:
//! a directional signal is never returned without its stop and size. Levels
//! below the risk/reward floor are kept, flagged `actionable = false`, and
//! sized to zero. The Monte Carlo simulation and the sentiment correlation
//! are enrichments: if either cannot be produced the field is `None`, a
//! warning is logged and the signal is still returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_core::confluence::{ConfluenceConfig, ConfluenceScorer, Signal};
use vantage_core::domain::{Bar, Timeframe};
use vantage_core::indicators::{volume_confirmation, IndicatorEngine};
use vantage_core::patterns::{NoPatterns, PatternSource};
use vantage_core::risk::{RiskFramework, RiskLevels};
use vantage_core::sentiment::{CorrelationResult, SentimentCorrelationEngine};
use vantage_core::sizing::{PositionSizer, PositionSizing};
use vantage_core::stats::{StatsKey, StatsSource};
use vantage_core::volatility::{VolatilityClassifier, VolatilityReading};
use vantage_core::AnalyticsError;

use crate::config::{AnalyticsConfig, PipelineConfig};
use crate::correlation_monitor::CorrelationMonitor;
use crate::monte_carlo::{RiskSimulationResult, SimulationRequest};
use crate::simulation_service::{RiskSimulationService, ServiceError, SimulationStatus};
use crate::stats_store::StatsStore;
use crate::weight_store::WeightStore;

/// Everything known about one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    /// Timestamp of the last bar in the window.
    pub as_of: DateTime<Utc>,
    pub signal: Signal,
    pub volatility: VolatilityReading,
    /// `None` only for a neutral signal.
    pub risk_levels: Option<RiskLevels>,
    /// `None` only for a neutral signal.
    pub position_sizing: Option<PositionSizing>,
    pub simulation: Option<RiskSimulationResult>,
    pub correlation: Option<CorrelationResult>,
}

/// How the pipeline obtains the Monte Carlo enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationMode {
    /// Use whatever is cached and let the service refresh in the background.
    #[default]
    Background,
    /// Block until a fresh simulation is available.
    Wait,
}

pub struct SignalPipeline {
    indicators: IndicatorEngine,
    classifier: VolatilityClassifier,
    confluence: ConfluenceConfig,
    weights: Arc<WeightStore>,
    risk: RiskFramework,
    sizer: PositionSizer,
    settings: PipelineConfig,
    stats: Arc<dyn StatsSource>,
    patterns: Arc<dyn PatternSource>,
    simulations: Arc<RiskSimulationService>,
    correlations: Arc<CorrelationMonitor>,
}

impl SignalPipeline {
    /// Build every component from `config`, with an empty stats store, no
    /// pattern detector and an empty correlation monitor.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            indicators: IndicatorEngine::new(config.indicators.clone())?,
            classifier: VolatilityClassifier::new(config.volatility)?,
            confluence: config.confluence,
            weights: Arc::new(WeightStore::new(config.weights.clone())?),
            risk: RiskFramework::new(config.risk.clone())?,
            sizer: PositionSizer::new(config.sizing)?,
            settings: config.pipeline.clone(),
            stats: Arc::new(StatsStore::new()),
            patterns: Arc::new(NoPatterns),
            simulations: Arc::new(RiskSimulationService::from_config(config)?),
            correlations: Arc::new(CorrelationMonitor::new(SentimentCorrelationEngine::new(
                config.correlation.clone(),
            )?)),
        })
    }

    pub fn with_stats(mut self, stats: Arc<dyn StatsSource>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_patterns(mut self, patterns: Arc<dyn PatternSource>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_weights(mut self, weights: Arc<WeightStore>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_correlations(mut self, correlations: Arc<CorrelationMonitor>) -> Self {
        self.correlations = correlations;
        self
    }

    pub fn weights(&self) -> &Arc<WeightStore> {
        &self.weights
    }

    pub fn simulations(&self) -> &Arc<RiskSimulationService> {
        &self.simulations
    }

    pub fn correlations(&self) -> &Arc<CorrelationMonitor> {
        &self.correlations
    }

    pub fn analyze(&self, symbol: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<SignalReport, AnalyticsError> {
        self.analyze_with(symbol, timeframe, bars, SimulationMode::Background)
    }

    pub fn analyze_with(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[Bar],
        mode: SimulationMode,
    ) -> Result<SignalReport, AnalyticsError> {
        let set = self.indicators.compute(bars)?;
        let as_of = bars
            .last()
            .map(|b| b.timestamp)
            .ok_or_else(|| AnalyticsError::invalid("empty bar window"))?;

        let volume = match volume_confirmation(bars, self.indicators.config().volume_period) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::debug!(symbol, %timeframe, %err, "scoring without volume confirmation");
                None
            }
        };
        let volatility = self.classifier.classify(set.atr, set.close)?;
        let findings = self.patterns.findings(symbol, timeframe);

        let scorer = ConfluenceScorer::new(self.confluence, self.weights.current())?;
        let signal = scorer.score(symbol, timeframe, &set, &findings, volume.as_ref())?;
        tracing::debug!(
            symbol,
            %timeframe,
            direction = %signal.direction,
            confidence = signal.confidence,
            tier = %volatility.tier,
            "signal scored"
        );

        let mut report = SignalReport {
            as_of,
            signal,
            volatility,
            risk_levels: None,
            position_sizing: None,
            simulation: None,
            correlation: None,
        };
        if !report.signal.direction.is_directional() {
            report.correlation = self.correlation(symbol);
            return Ok(report);
        }

        let levels = self.levels(&report.signal, set.atr, &volatility)?;
        report.position_sizing = Some(self.sizing(symbol, timeframe, &levels)?);
        report.risk_levels = Some(levels);
        report.simulation = self.simulation(
            SimulationRequest::from_bars(symbol, timeframe, report.signal.direction, bars),
            mode,
        );
        report.correlation = self.correlation(symbol);
        Ok(report)
    }

    fn levels(
        &self,
        signal: &Signal,
        atr: f64,
        volatility: &VolatilityReading,
    ) -> Result<RiskLevels, AnalyticsError> {
        self.risk.compute_levels(
            signal.entry_price,
            atr,
            signal.direction,
            volatility.tier,
            signal.timeframe,
        )
    }

    fn sizing(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        levels: &RiskLevels,
    ) -> Result<PositionSizing, AnalyticsError> {
        let key = StatsKey::new(symbol, timeframe, self.settings.stats_category.as_str());
        let stats = self.stats.snapshot(&key);
        self.sizer
            .size_for_levels(stats.as_ref(), self.settings.account_balance, levels)
    }

    fn simulation(&self, req: SimulationRequest, mode: SimulationMode) -> Option<RiskSimulationResult> {
        let symbol = req.symbol.clone();
        match mode {
            SimulationMode::Wait => match self.simulations.get_or_wait(req) {
                Ok(result) => Some((*result).clone()),
                Err(err) => {
                    tracing::warn!(%symbol, %err, "monte carlo simulation unavailable");
                    None
                }
            },
            SimulationMode::Background => match self.simulations.request(req) {
                SimulationStatus::Ready(r) | SimulationStatus::Stale(r) => Some((*r).clone()),
                SimulationStatus::Pending => {
                    tracing::debug!(%symbol, "monte carlo simulation pending");
                    None
                }
                SimulationStatus::Failed(err) => {
                    tracing::warn!(%symbol, %err, "monte carlo simulation unavailable");
                    None
                }
            },
        }
    }

    fn correlation(&self, symbol: &str) -> Option<CorrelationResult> {
        let result = self.correlations.correlate(symbol);
        if result.sufficient {
            Some(result)
        } else {
            tracing::warn!(
                symbol,
                samples = result.sample_size,
                "sentiment correlation unavailable"
            );
            None
        }
    }
}

impl std::fmt::Debug for SignalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalPipeline")
            .field("weights_version", &self.weights.version())
            .field("settings", &self.settings)
            .field("simulations", &self.simulations)
            .finish()
    }
}
