//! Error taxonomy shared by every numeric component.
//!
//! Pure components never substitute fallback values for missing or invalid
//! data: they return one of these variants and the caller decides whether to
//! wait for the next bar or surface "no signal available".

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// Window shorter than the indicator needs. Recoverable by waiting for more bars.
    #[error("insufficient data for {indicator}: need {required} bars, have {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    /// Non-finite, negative-where-disallowed, or internally inconsistent input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A computed value broke an invariant that valid input can never break.
    #[error("computation invariant violated: {0}")]
    InvariantViolation(String),

    /// Not enough samples for a statistically meaningful answer.
    #[error("statistically insufficient {what}: need {required} samples, have {available}")]
    StatisticalInsufficiency {
        what: &'static str,
        required: usize,
        available: usize,
    },

    /// Risk levels are well-formed but fall below the actionable risk/reward floor.
    #[error("risk levels not actionable: risk/reward {ratio:.2} below minimum {minimum:.2}")]
    NotActionable { ratio: f64, minimum: f64 },
}

impl AnalyticsError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Build an `InvariantViolation` and log it. These indicate bugs, so they
    /// are always recorded at error level before propagating.
    pub fn invariant(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!(%reason, "computation invariant violated");
        Self::InvariantViolation(reason)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Reject NaN and infinities with a named field in the message.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64, AnalyticsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyticsError::invalid(format!("{name} must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_names_indicator() {
        let err = AnalyticsError::InsufficientData {
            indicator: "rsi",
            required: 15,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for rsi: need 15 bars, have 10"
        );
    }

    #[test]
    fn only_invariant_violations_are_fatal() {
        assert!(AnalyticsError::invariant("bands crossed").is_fatal());
        assert!(!AnalyticsError::invalid("nan").is_fatal());
    }

    #[test]
    fn ensure_finite_rejects_nan() {
        assert!(ensure_finite("atr", 1.0).is_ok());
        assert!(ensure_finite("atr", f64::NAN).is_err());
        assert!(ensure_finite("atr", f64::INFINITY).is_err());
    }
}
