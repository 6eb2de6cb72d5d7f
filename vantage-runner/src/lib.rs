//! Vantage Runner: services around the pure numerics in `vantage-core`.
//!
//! This crate provides:
//! - TOML configuration for every component
//! - CSV loading for bars, sentiment samples and price ticks
//! - Monte Carlo risk simulation on rayon with deterministic per-path RNGs
//! - A background simulation service with a TTL cache and in-flight dedup
//! - Concurrent trade statistics and a hot-swappable weight table
//! - A correlation monitor with revision-based refresh
//! - The signal pipeline that assembles a full `SignalReport`

pub mod config;
pub mod correlation_monitor;
pub mod data_loader;
pub mod monte_carlo;
pub mod pipeline;
pub mod rng;
pub mod simulation_service;
pub mod stats_store;
pub mod weight_store;

pub use config::{AnalyticsConfig, ConfigError, PipelineConfig, ServiceConfig};
pub use correlation_monitor::{CorrelationMonitor, RefreshHandle};
pub use data_loader::{load_bars, load_prices, load_sentiment, LoadError};
pub use monte_carlo::{MonteCarloConfig, MonteCarloSimulator, RiskSimulationResult, SimulationRequest};
pub use pipeline::{SignalPipeline, SignalReport, SimulationMode};
pub use rng::RngHierarchy;
pub use simulation_service::{RiskSimulationService, ServiceError, SimulationKey, SimulationStatus};
pub use stats_store::StatsStore;
pub use weight_store::WeightStore;
