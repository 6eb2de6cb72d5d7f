//! Volume confirmation: is the latest move backed by above-average volume?

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::AnalyticsError;

/// Latest bar's volume relative to the trailing mean, with the sign of the
/// latest close-to-close move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfirmation {
    /// Last volume / mean volume of the preceding `period` bars.
    pub volume_ratio: f64,
    /// +1 if the last close rose, -1 if it fell, 0 if unchanged.
    pub price_direction: f64,
}

impl VolumeConfirmation {
    /// Directional vote in [-1, 1]: above-average volume confirms the move,
    /// below-average volume counts against it.
    pub fn vote(&self) -> f64 {
        (self.price_direction * (self.volume_ratio - 1.0)).clamp(-1.0, 1.0)
    }
}

/// Compute volume confirmation from the tail of `bars`.
///
/// Needs `period + 1` bars: `period` for the trailing mean plus the latest bar.
pub fn volume_confirmation(bars: &[Bar], period: usize) -> Result<VolumeConfirmation, AnalyticsError> {
    if period == 0 {
        return Err(AnalyticsError::invalid("volume period must be >= 1"));
    }
    let required = period + 1;
    if bars.len() < required {
        return Err(AnalyticsError::InsufficientData {
            indicator: "volume",
            required,
            available: bars.len(),
        });
    }

    let last = &bars[bars.len() - 1];
    let prev = &bars[bars.len() - 2];
    let trailing = &bars[bars.len() - 1 - period..bars.len() - 1];
    let mean = trailing.iter().map(|b| b.volume).sum::<f64>() / period as f64;

    if !mean.is_finite() || mean <= 0.0 {
        return Err(AnalyticsError::invalid(
            "trailing volume is zero; volume confirmation undefined",
        ));
    }

    let change = last.close - prev.close;
    let price_direction = if change > 0.0 {
        1.0
    } else if change < 0.0 {
        -1.0
    } else {
        0.0
    };

    Ok(VolumeConfirmation {
        volume_ratio: last.volume / mean,
        price_direction,
    })
}
