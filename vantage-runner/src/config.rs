//! Analytics configuration loaded from TOML.
//!
//! One file configures every component. Every section and every field is
//! optional; anything missing falls back to its default. The whole config
//! is validated before any component is built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vantage_core::confluence::ConfluenceConfig;
use vantage_core::indicators::IndicatorConfig;
use vantage_core::risk::RiskConfig;
use vantage_core::sentiment::CorrelationConfig;
use vantage_core::sizing::SizingConfig;
use vantage_core::volatility::VolatilityThresholds;
use vantage_core::weights::WeightTable;
use vantage_core::AnalyticsError;

use crate::monte_carlo::MonteCarloConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] AnalyticsError),
}

/// Background-service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How long a finished simulation stays fresh.
    pub cache_ttl_secs: u64,
    /// Size of the private simulation pool. 0 means one per core.
    pub worker_threads: usize,
    /// Period of the background correlation refresh.
    pub refresh_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            worker_threads: 0,
            refresh_interval_secs: 60,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.cache_ttl_secs == 0 {
            return Err(AnalyticsError::invalid("service.cache_ttl_secs must be >= 1"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(AnalyticsError::invalid(
                "service.refresh_interval_secs must be >= 1",
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Settings the signal pipeline applies on top of the components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub account_balance: f64,
    /// Category under which win/loss statistics are kept for sizing.
    pub stats_category: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            stats_category: "confluence".into(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.account_balance.is_finite() || self.account_balance <= 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "pipeline.account_balance must be > 0, got {}",
                self.account_balance
            )));
        }
        if self.stats_category.trim().is_empty() {
            return Err(AnalyticsError::invalid("pipeline.stats_category must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub indicators: IndicatorConfig,
    pub weights: WeightTable,
    pub confluence: ConfluenceConfig,
    pub volatility: VolatilityThresholds,
    pub risk: RiskConfig,
    pub sizing: SizingConfig,
    pub monte_carlo: MonteCarloConfig,
    pub correlation: CorrelationConfig,
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
}

impl AnalyticsConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.indicators.validate()?;
        self.weights.validate()?;
        self.confluence.validate()?;
        self.volatility.validate()?;
        self.risk.validate()?;
        self.sizing.validate()?;
        self.monte_carlo.validate()?;
        self.correlation.validate()?;
        self.service.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}
