//! Historical trade outcome statistics feeding position sizing.

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;
use crate::error::{ensure_finite, AnalyticsError};

/// Running win/loss aggregate. Loss amounts are stored as positive magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub wins: u64,
    pub losses: u64,
    pub gross_win: f64,
    pub gross_loss: f64,
}

impl TradeStats {
    pub fn record_win(&mut self, amount: f64) -> Result<(), AnalyticsError> {
        ensure_finite("win amount", amount)?;
        if amount <= 0.0 {
            return Err(AnalyticsError::invalid(format!("win amount must be > 0, got {amount}")));
        }
        self.wins += 1;
        self.gross_win += amount;
        Ok(())
    }

    /// Record a loss of `amount` (magnitude; the sign is ignored).
    pub fn record_loss(&mut self, amount: f64) -> Result<(), AnalyticsError> {
        ensure_finite("loss amount", amount)?;
        if amount == 0.0 {
            return Err(AnalyticsError::invalid("loss amount must be non-zero"));
        }
        self.losses += 1;
        self.gross_loss += amount.abs();
        Ok(())
    }

    /// Record a signed P&L: positive is a win, negative a loss, zero is ignored.
    pub fn record_outcome(&mut self, pnl: f64) -> Result<(), AnalyticsError> {
        ensure_finite("pnl", pnl)?;
        if pnl > 0.0 {
            self.record_win(pnl)
        } else if pnl < 0.0 {
            self.record_loss(pnl)
        } else {
            Ok(())
        }
    }

    pub fn trades(&self) -> u64 {
        self.wins + self.losses
    }

    /// `None` until at least one trade is recorded.
    pub fn win_rate(&self) -> Option<f64> {
        match self.trades() {
            0 => None,
            n => Some(self.wins as f64 / n as f64),
        }
    }

    pub fn avg_win(&self) -> Option<f64> {
        (self.wins > 0).then(|| self.gross_win / self.wins as f64)
    }

    pub fn avg_loss(&self) -> Option<f64> {
        (self.losses > 0).then(|| self.gross_loss / self.losses as f64)
    }
}

/// Statistics are tracked per symbol, timeframe and indicator category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatsKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub category: String,
}

impl StatsKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, category: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            category: category.into(),
        }
    }
}

/// Read access to aggregated outcome statistics.
pub trait StatsSource: Send + Sync {
    /// Consistent snapshot for `key`, `None` when nothing was recorded.
    fn snapshot(&self, key: &StatsKey) -> Option<TradeStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_rates() {
        let s = TradeStats::default();
        assert_eq!(s.win_rate(), None);
        assert_eq!(s.avg_win(), None);
        assert_eq!(s.avg_loss(), None);
    }

    #[test]
    fn averages_from_outcomes() {
        let mut s = TradeStats::default();
        for pnl in [200.0, 100.0, -50.0, 300.0, -150.0] {
            s.record_outcome(pnl).unwrap();
        }
        assert_eq!(s.trades(), 5);
        assert!((s.win_rate().unwrap() - 0.6).abs() < 1e-12);
        assert!((s.avg_win().unwrap() - 200.0).abs() < 1e-12);
        assert!((s.avg_loss().unwrap() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn scratch_trades_ignored() {
        let mut s = TradeStats::default();
        s.record_outcome(0.0).unwrap();
        assert_eq!(s.trades(), 0);
    }

    #[test]
    fn non_finite_amounts_rejected() {
        let mut s = TradeStats::default();
        assert!(s.record_win(f64::NAN).is_err());
        assert!(s.record_win(-1.0).is_err());
        assert!(s.record_loss(f64::INFINITY).is_err());
        assert_eq!(s, TradeStats::default());
    }
}
