//! Configuration error taxonomy.
//!
//! Every stage validates its parameters at call time. Data-shape gaps
//! (missing columns, missing history, zero-close days) are never errors:
//! they are handled by skip-and-continue inside the stages.

use thiserror::Error;

/// Fatal configuration errors. Raised immediately, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported entry order policy '{0}' (expected 'market' or 'limit')")]
    UnsupportedEntryOrder(String),

    #[error(
        "unsupported Bollinger rule '{0}' (expected 'touch_lower', 'below_lower' or 'cross_up_from_below')"
    )]
    UnsupportedBollingerRule(String),

    #[error("unsupported period '{0}' (expected 'Monthly', 'Weekly' or 'Daily')")]
    UnsupportedPeriod(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("asset universe is empty")]
    EmptyUniverse,

    #[error("asset '{0}' is not present in the price table")]
    UnknownAsset(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
