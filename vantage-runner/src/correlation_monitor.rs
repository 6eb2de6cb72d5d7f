//! Shared sentiment correlation state with opportunistic refresh.
//!
//! Ingestion appends to the engine's per-symbol histories under a write
//! lock. `refresh` recomputes only symbols whose history revision moved
//! since their cached result, and a result computed from an older revision
//! never replaces a newer one.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use vantage_core::sentiment::{
    CorrelationResult, PriceTick, SentimentCorrelationEngine, SentimentFeed, SentimentScore,
};
use vantage_core::AnalyticsError;

#[derive(Debug, Default)]
pub struct CorrelationMonitor {
    engine: RwLock<SentimentCorrelationEngine>,
    results: RwLock<HashMap<String, CorrelationResult>>,
}

impl CorrelationMonitor {
    pub fn new(engine: SentimentCorrelationEngine) -> Self {
        Self {
            engine: RwLock::new(engine),
            results: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_sentiment(&self, symbol: &str, score: SentimentScore) -> Result<u64, AnalyticsError> {
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_sentiment(symbol, score)
    }

    pub fn record_price(&self, symbol: &str, tick: PriceTick) -> Result<u64, AnalyticsError> {
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record_price(symbol, tick)
    }

    /// Poll `feed` for `symbol` and append samples newer than the latest
    /// one already held. Returns how many were appended.
    ///
    /// The batch is checked before anything is appended: one invalid or
    /// out-of-order sample rejects the whole poll and leaves the history
    /// unchanged.
    pub fn ingest_from(&self, feed: &dyn SentimentFeed, symbol: &str) -> Result<usize, AnalyticsError> {
        let samples = feed.poll(symbol)?;
        let mut engine = self.engine.write().unwrap_or_else(PoisonError::into_inner);
        let latest = engine
            .history(symbol)
            .and_then(|h| h.latest_sentiment())
            .map(|s| s.timestamp);

        let fresh: Vec<SentimentScore> = samples
            .into_iter()
            .filter(|s| latest.map_or(true, |t| s.timestamp > t))
            .collect();
        let mut prev = latest;
        for score in &fresh {
            score.validate()?;
            if prev.is_some_and(|t| score.timestamp < t) {
                tracing::warn!(symbol, timestamp = %score.timestamp, "feed returned out-of-order sentiment");
                return Err(AnalyticsError::invalid(format!(
                    "sentiment for {symbol} out of order at {}",
                    score.timestamp
                )));
            }
            prev = Some(score.timestamp);
        }

        let appended = fresh.len();
        for score in fresh {
            engine.record_sentiment(symbol, score)?;
        }
        tracing::debug!(symbol, appended, "ingested sentiment");
        Ok(appended)
    }

    pub fn revision(&self, symbol: &str) -> u64 {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision(symbol)
    }

    /// Cached result, possibly behind the current history.
    pub fn latest(&self, symbol: &str) -> Option<CorrelationResult> {
        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned()
    }

    /// Result for the current history, computing it if the cache is behind.
    pub fn correlate(&self, symbol: &str) -> CorrelationResult {
        let revision = self.revision(symbol);
        if let Some(cached) = self.latest(symbol).filter(|r| r.history_revision == revision) {
            return cached;
        }
        let result = self
            .engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .correlate(symbol);
        self.store(result.clone());
        result
    }

    /// Recompute every symbol whose history changed. Returns the number of
    /// results stored.
    pub fn refresh(&self) -> usize {
        let stale: Vec<String> = {
            let engine = self.engine.read().unwrap_or_else(PoisonError::into_inner);
            let results = self.results.read().unwrap_or_else(PoisonError::into_inner);
            let mut stale: Vec<String> = engine
                .symbols()
                .filter(|s| results.get(*s).map_or(true, |r| r.history_revision != engine.revision(s)))
                .map(str::to_string)
                .collect();
            stale.sort();
            stale
        };

        let mut stored = 0;
        for symbol in &stale {
            let result = self
                .engine
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .correlate(symbol);
            if self.store(result) {
                stored += 1;
            }
        }
        if stored > 0 {
            tracing::debug!(stale = stale.len(), stored, "correlation refresh");
        }
        stored
    }

    /// Insert unless a result from a newer revision is already cached.
    fn store(&self, result: CorrelationResult) -> bool {
        let mut results = self.results.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = results.get(&result.symbol) {
            if existing.history_revision > result.history_revision {
                tracing::debug!(
                    symbol = %result.symbol,
                    computed = result.history_revision,
                    cached = existing.history_revision,
                    "discarding stale correlation"
                );
                return false;
            }
        }
        results.insert(result.symbol.clone(), result);
        true
    }

    /// Call `refresh` every `interval` on a named background thread until
    /// the returned handle is stopped or dropped.
    pub fn spawn_refresher(self: &Arc<Self>, interval: Duration) -> std::io::Result<RefreshHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let monitor = Arc::clone(self);
        let join = thread::Builder::new()
            .name("vantage-correlation".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        monitor.refresh();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(RefreshHandle {
            stop: Some(stop_tx),
            join: Some(join),
        })
    }
}

/// Stops the refresher thread on drop.
#[derive(Debug)]
pub struct RefreshHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("correlation refresher thread panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
