//! Vantage Core: deterministic signal and risk numerics.
//!
//! This crate contains the pure part of the analytics engine:
//! - Domain types (bars, timeframes, directions)
//! - Indicator engine (RSI, MACD, Bollinger, ATR, Stochastic, volume confirmation)
//! - Volatility tier classification
//! - Confluence scoring against versioned, per-timeframe weight tables
//! - ATR-based stop-loss / take-profit levels and Kelly position sizing
//! - Sentiment histories and sentiment→price correlation with lag scan
//!
//! Nothing here reads the clock, draws random numbers or holds shared state.
//! Services that cache, schedule or simulate live in `vantage-runner`.

pub mod confluence;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod patterns;
pub mod risk;
pub mod sentiment;
pub mod sizing;
pub mod stats;
pub mod volatility;
pub mod weights;

pub use error::AnalyticsError;
