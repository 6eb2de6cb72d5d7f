//! CSV loading for bars, sentiment samples and price ticks.
//!
//! Expected headers:
//! - bars: `timestamp,open,high,low,close,volume`
//! - sentiment: `timestamp,overall,news,social,confidence,source_count[,trend]`
//! - prices: `timestamp,price`
//!
//! Timestamps are RFC 3339. Every row is validated and series must be
//! ordered; a bad row fails the whole load with its line number.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use vantage_core::domain::{validate_series, Bar};
use vantage_core::sentiment::{PriceTick, SentimentScore, SentimentTrend};
use vantage_core::AnalyticsError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {source}")]
    Invalid {
        line: u64,
        #[source]
        source: AnalyticsError,
    },

    #[error("{0}")]
    Series(#[from] AnalyticsError),

    #[error("{what} file is empty")]
    Empty { what: &'static str },
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    timestamp: DateTime<Utc>,
    overall: f64,
    news: f64,
    social: f64,
    confidence: f64,
    source_count: u32,
    #[serde(default)]
    trend: Option<SentimentTrend>,
}

impl From<SentimentRow> for SentimentScore {
    fn from(row: SentimentRow) -> Self {
        SentimentScore {
            overall: row.overall,
            news: row.news,
            social: row.social,
            confidence: row.confidence,
            source_count: row.source_count,
            trend: row
                .trend
                .unwrap_or_else(|| SentimentTrend::from_overall(row.overall)),
            timestamp: row.timestamp,
        }
    }
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::Reader::from_path(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Deserialize every row, validating each with `check`.
fn read_rows<R, T>(
    reader: &mut csv::Reader<R>,
    check: impl Fn(&T) -> Result<(), AnalyticsError>,
) -> Result<Vec<T>, LoadError>
where
    R: Read,
    T: serde::de::DeserializeOwned,
{
    let headers = reader
        .headers()
        .map_err(|source| LoadError::Row { line: 1, source })?
        .clone();
    let mut out = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(source) => {
                let line = source.position().map(|p| p.line()).unwrap_or(0);
                return Err(LoadError::Row { line, source });
            }
        }
        let line = line_of(&record);
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::Row { line, source })?;
        check(&row).map_err(|source| LoadError::Invalid { line, source })?;
        out.push(row);
    }
    Ok(out)
}

pub fn read_bars<R: Read>(input: R) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    finish_bars(read_rows(&mut reader, Bar::validate)?)
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    finish_bars(read_rows(&mut open(path)?, Bar::validate)?)
}

fn finish_bars(bars: Vec<Bar>) -> Result<Vec<Bar>, LoadError> {
    if bars.is_empty() {
        return Err(LoadError::Empty { what: "bar" });
    }
    validate_series(&bars)?;
    tracing::debug!(bars = bars.len(), "loaded bars");
    Ok(bars)
}

pub fn read_sentiment<R: Read>(input: R) -> Result<Vec<SentimentScore>, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    finish_sentiment(read_rows(&mut reader, |_: &SentimentRow| Ok(()))?)
}

pub fn load_sentiment(path: &Path) -> Result<Vec<SentimentScore>, LoadError> {
    finish_sentiment(read_rows(&mut open(path)?, |_: &SentimentRow| Ok(()))?)
}

fn finish_sentiment(rows: Vec<SentimentRow>) -> Result<Vec<SentimentScore>, LoadError> {
    let scores: Vec<SentimentScore> = rows.into_iter().map(SentimentScore::from).collect();
    for (i, score) in scores.iter().enumerate() {
        // Header is line 1.
        let line = i as u64 + 2;
        score
            .validate()
            .map_err(|source| LoadError::Invalid { line, source })?;
        if i > 0 && score.timestamp < scores[i - 1].timestamp {
            return Err(LoadError::Invalid {
                line,
                source: AnalyticsError::invalid(format!(
                    "sentiment timestamp {} goes backwards",
                    score.timestamp
                )),
            });
        }
    }
    tracing::debug!(samples = scores.len(), "loaded sentiment");
    Ok(scores)
}

pub fn read_prices<R: Read>(input: R) -> Result<Vec<PriceTick>, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    finish_prices(read_rows(&mut reader, PriceTick::validate)?)
}

pub fn load_prices(path: &Path) -> Result<Vec<PriceTick>, LoadError> {
    finish_prices(read_rows(&mut open(path)?, PriceTick::validate)?)
}

fn finish_prices(ticks: Vec<PriceTick>) -> Result<Vec<PriceTick>, LoadError> {
    if let Some(i) = ticks.windows(2).position(|w| w[1].timestamp < w[0].timestamp) {
        return Err(LoadError::Invalid {
            line: i as u64 + 3,
            source: AnalyticsError::invalid(format!(
                "price timestamp {} goes backwards",
                ticks[i + 1].timestamp
            )),
        });
    }
    tracing::debug!(ticks = ticks.len(), "loaded prices");
    Ok(ticks)
}
