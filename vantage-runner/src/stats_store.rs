//! Concurrent per-key trade outcome statistics.
//!
//! The outer map lock is held only long enough to find or insert a key.
//! Each key has its own mutex, so outcomes for different keys never contend
//! and a snapshot always sees wins, losses and gross totals from the same
//! point in time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use vantage_core::stats::{StatsKey, StatsSource, TradeStats};
use vantage_core::AnalyticsError;

#[derive(Debug, Default)]
pub struct StatsStore {
    entries: RwLock<HashMap<StatsKey, Arc<Mutex<TradeStats>>>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &StatsKey) -> Arc<Mutex<TradeStats>> {
        {
            let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = map.get(key) {
                return Arc::clone(slot);
            }
        }
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(key.clone()).or_default())
    }

    /// Record a signed P&L for `key`. Zero P&L is ignored.
    pub fn record_outcome(&self, key: &StatsKey, pnl: f64) -> Result<(), AnalyticsError> {
        let slot = self.entry(key);
        let mut stats = slot.lock().unwrap_or_else(PoisonError::into_inner);
        // Validate on a copy so a rejected outcome leaves the entry untouched.
        let mut next = *stats;
        next.record_outcome(pnl)?;
        *stats = next;
        tracing::trace!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            category = %key.category,
            pnl,
            trades = stats.trades(),
            "recorded trade outcome"
        );
        Ok(())
    }

    /// Seed a key with an existing aggregate, replacing what was there.
    ///
    /// The slot is overwritten in place under its own lock, so an outcome
    /// recorded concurrently lands either before or after the replacement.
    pub fn insert(&self, key: StatsKey, stats: TradeStats) {
        let slot = self.entry(&key);
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = stats;
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<StatsKey> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<StatsKey> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl StatsSource for StatsStore {
    fn snapshot(&self, key: &StatsKey) -> Option<TradeStats> {
        let slot = {
            let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.get(key)?)
        };
        let stats = *slot.lock().unwrap_or_else(PoisonError::into_inner);
        Some(stats)
    }
}
