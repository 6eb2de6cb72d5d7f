//! Bounded per-symbol sentiment and price histories.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::{PriceTick, SentimentScore};
use crate::error::AnalyticsError;

/// Rolling sentiment and price series for one symbol.
///
/// Both series are fixed-capacity ring buffers ordered by timestamp; the
/// oldest entry is evicted on overflow. Every accepted append bumps
/// `revision`, which lets consumers detect whether a cached correlation is stale.
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    sentiment: VecDeque<SentimentScore>,
    prices: VecDeque<PriceTick>,
    sentiment_capacity: usize,
    price_capacity: usize,
    revision: u64,
}

impl SymbolHistory {
    pub fn new(sentiment_capacity: usize, price_capacity: usize) -> Self {
        assert!(sentiment_capacity >= 1, "sentiment capacity must be >= 1");
        assert!(price_capacity >= 1, "price capacity must be >= 1");
        Self {
            sentiment: VecDeque::with_capacity(sentiment_capacity),
            prices: VecDeque::with_capacity(price_capacity),
            sentiment_capacity,
            price_capacity,
            revision: 0,
        }
    }

    pub fn push_sentiment(&mut self, score: SentimentScore) -> Result<u64, AnalyticsError> {
        score.validate()?;
        check_order("sentiment", self.sentiment.back().map(|s| s.timestamp), score.timestamp)?;
        if self.sentiment.len() == self.sentiment_capacity {
            self.sentiment.pop_front();
        }
        self.sentiment.push_back(score);
        self.revision += 1;
        Ok(self.revision)
    }

    pub fn push_price(&mut self, tick: PriceTick) -> Result<u64, AnalyticsError> {
        tick.validate()?;
        check_order("price", self.prices.back().map(|p| p.timestamp), tick.timestamp)?;
        if self.prices.len() == self.price_capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(tick);
        self.revision += 1;
        Ok(self.revision)
    }

    pub fn sentiment(&self) -> &VecDeque<SentimentScore> {
        &self.sentiment
    }

    pub fn prices(&self) -> &VecDeque<PriceTick> {
        &self.prices
    }

    pub fn latest_sentiment(&self) -> Option<&SentimentScore> {
        self.sentiment.back()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Price tick closest to `target`, if one lies within `window`.
    /// On an exact tie the earlier tick wins.
    pub fn closest_price(&self, target: DateTime<Utc>, window: chrono::Duration) -> Option<&PriceTick> {
        let idx = self.prices.partition_point(|p| p.timestamp < target);
        let before = idx.checked_sub(1).and_then(|i| self.prices.get(i));
        let after = self.prices.get(idx);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if target - b.timestamp <= a.timestamp - target {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        ((best.timestamp - target).abs() <= window).then_some(best)
    }
}

fn check_order(
    series: &str,
    last: Option<DateTime<Utc>>,
    next: DateTime<Utc>,
) -> Result<(), AnalyticsError> {
    match last {
        Some(last) if next < last => Err(AnalyticsError::invalid(format!(
            "{series} timestamp {next} precedes last accepted {last}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::score_at;
    use chrono::{Duration, TimeZone};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn oldest_entries_evicted() {
        let mut h = SymbolHistory::new(3, 3);
        for m in 0..5 {
            h.push_sentiment(score_at(t(m), 0.1)).unwrap();
        }
        assert_eq!(h.sentiment().len(), 3);
        assert_eq!(h.sentiment()[0].timestamp, t(2));
        assert_eq!(h.revision(), 5);
    }

    #[test]
    fn out_of_order_rejected_without_bumping_revision() {
        let mut h = SymbolHistory::new(10, 10);
        h.push_price(PriceTick { timestamp: t(5), price: 100.0 }).unwrap();
        assert!(h.push_price(PriceTick { timestamp: t(4), price: 100.0 }).is_err());
        assert_eq!(h.revision(), 1);
        // equal timestamps are allowed
        h.push_price(PriceTick { timestamp: t(5), price: 101.0 }).unwrap();
        assert_eq!(h.revision(), 2);
    }

    #[test]
    fn invalid_samples_rejected() {
        let mut h = SymbolHistory::new(10, 10);
        assert!(h.push_sentiment(score_at(t(0), 2.0)).is_err());
        assert!(h.push_price(PriceTick { timestamp: t(0), price: -1.0 }).is_err());
        assert_eq!(h.revision(), 0);
    }

    #[test]
    fn closest_price_within_window() {
        let mut h = SymbolHistory::new(10, 10);
        for (m, p) in [(0, 100.0), (10, 110.0), (20, 120.0)] {
            h.push_price(PriceTick { timestamp: t(m), price: p }).unwrap();
        }
        let w = Duration::minutes(3);
        assert_eq!(h.closest_price(t(9), w).unwrap().price, 110.0);
        assert_eq!(h.closest_price(t(12), w).unwrap().price, 110.0);
        assert_eq!(h.closest_price(t(21), w).unwrap().price, 120.0);
        assert!(h.closest_price(t(5), w).is_none());
        assert!(h.closest_price(t(30), w).is_none());
        // tie goes to the earlier tick
        assert_eq!(h.closest_price(t(5), Duration::minutes(5)).unwrap().price, 100.0);
    }
}
