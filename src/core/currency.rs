//! Currency codes, rate snapshots and the rate source abstraction

use crate::core::error::{ExchangeError, ExchangeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// A three letter currency code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Builds a code known to be valid at compile time.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()));
        Currency(code.to_string())
    }

    pub fn eur() -> Self {
        Self::from_static("EUR")
    }

    pub fn usd() -> Self {
        Self::from_static("USD")
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Currency(code.to_ascii_uppercase()))
        } else {
            Err(ExchangeError::InvalidSelection(format!(
                "'{s}' is not a currency code"
            )))
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = ExchangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// The set of currencies a user is allowed to pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyRegistry {
    known: Vec<Currency>,
}

impl CurrencyRegistry {
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut known: Vec<Currency> = Vec::new();
        for currency in currencies {
            if !known.contains(&currency) {
                known.push(currency);
            }
        }
        Self { known }
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.known.contains(currency)
    }

    /// Parses `code` and checks it is registered.
    pub fn resolve(&self, code: &str) -> ExchangeResult<Currency> {
        let currency: Currency = code.parse()?;
        if self.contains(&currency) {
            Ok(currency)
        } else {
            Err(ExchangeError::InvalidSelection(format!(
                "{currency} is not a supported currency"
            )))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.known.iter()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new(
            [
                "EUR", "USD", "GBP", "CHF", "JPY", "PLN", "CZK", "HUF", "SEK", "NOK", "DKK", "CAD",
                "AUD", "UAH",
            ]
            .into_iter()
            .map(Currency::from_static),
        )
    }
}

/// Rates relative to `base`, as returned by one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base: Currency,
    pub rates: HashMap<Currency, Decimal>,
    /// Date the source reports the rates for, verbatim.
    pub as_of: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Creates a snapshot; the base currency is pinned to a rate of one.
    pub fn new(base: Currency, mut rates: HashMap<Currency, Decimal>) -> Self {
        rates.entry(base.clone()).or_insert(Decimal::ONE);
        Self {
            base,
            rates,
            as_of: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_as_of(mut self, as_of: Option<String>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Rate of `currency` against the base. Zero rates count as missing.
    pub fn rate(&self, currency: &Currency) -> ExchangeResult<Decimal> {
        match self.rates.get(currency) {
            Some(rate) if rate.is_sign_positive() && !rate.is_zero() => Ok(*rate),
            _ => Err(ExchangeError::Lookup(currency.clone())),
        }
    }

    pub fn has_rate(&self, currency: &Currency) -> bool {
        self.rate(currency).is_ok()
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> ExchangeResult<RateSnapshot>;
}
