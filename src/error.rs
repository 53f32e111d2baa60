//! Error types for the bankroll core.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the ledger, configuration layer and projections.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeGuardError {
    /// A negative stake was proposed for a trade.
    #[error("invalid stake {0}: stake must not be negative")]
    InvalidStake(Decimal),

    /// A configuration value could not be parsed or was out of range.
    ///
    /// Always recovered by substituting a safe value; callers receive it as
    /// a diagnostic, never as a failure.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// A projection was cancelled between trials.
    #[error("projection cancelled after {completed} trials")]
    ProjectionCancelled { completed: usize },
}

impl TradeGuardError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TradeGuardError>;
