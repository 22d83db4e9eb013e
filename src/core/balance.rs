//! Balances and the store that keeps them between sessions

use crate::core::currency::Currency;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: Currency,
    pub amount: Decimal,
}

impl Balance {
    pub fn new(currency: Currency, amount: Decimal) -> Self {
        Self { currency, amount }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, Decimal::ZERO)
    }
}

/// Finds the balance held in `currency`.
pub fn find_balance<'a>(balances: &'a [Balance], currency: &Currency) -> Option<&'a Balance> {
    balances.iter().find(|b| &b.currency == currency)
}

/// What a store hands out before anything has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDefaults {
    pub balances: Vec<Balance>,
    pub free_conversions: u32,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            balances: vec![
                Balance::new(Currency::eur(), Decimal::new(100000, 2)),
                Balance::new(Currency::usd(), Decimal::new(0, 2)),
            ],
            free_conversions: 5,
        }
    }
}

/// Persistent user data: balances and the free conversion counter.
pub trait BalanceStore: Send + Sync {
    fn get_balances(&self) -> Result<Vec<Balance>>;

    fn set_balances(&self, balances: &[Balance]) -> Result<()>;

    fn get_free_conversions(&self) -> Result<u32>;

    /// Lowers the counter by one. Does nothing once it reaches zero.
    fn decrement_free_conversions(&self) -> Result<()>;

    /// Writes `balances` and decrements the counter as a single write.
    /// Returns the counter after the decrement.
    fn commit_conversion(&self, balances: &[Balance]) -> Result<u32>;
}
