//! Error taxonomy for the exchange core.

use crate::core::currency::Currency;
use thiserror::Error;

/// Errors raised by the rate source, the conversion engine and the
/// orchestrator.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The rate request never produced a response.
    #[error("Transport error while fetching rates: {0}")]
    Transport(String),

    /// The rate server answered with a non-success status.
    #[error("Rate server responded with HTTP {status}")]
    Server { status: u16 },

    /// The rate server answered, but the body was not a rate table.
    #[error("Failed to decode rate response: {0}")]
    Decode(String),

    /// No usable rate for the currency in the current snapshot.
    #[error("No rate available for {0}")]
    Lookup(Currency),

    /// Currency is unknown or cannot be used for this conversion.
    #[error("Invalid currency selection: {0}")]
    InvalidSelection(String),

    /// User supplied amount was rejected.
    #[error("Invalid amount '{input}': {reason}")]
    Validation { input: String, reason: String },

    #[error("Balance store error: {0:#}")]
    Store(anyhow::Error),
}

impl ExchangeError {
    pub(crate) fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ExchangeError::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
