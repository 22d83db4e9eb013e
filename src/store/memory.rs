use crate::core::balance::{Balance, BalanceStore, StoreDefaults};
use anyhow::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

struct UserData {
    balances: Vec<Balance>,
    free_conversions: u32,
}

/// Balance store that lives only as long as the process.
pub struct MemoryBalanceStore {
    inner: Mutex<UserData>,
}

impl MemoryBalanceStore {
    /// Creates a store pre-filled with `defaults`.
    pub fn new(defaults: StoreDefaults) -> Self {
        Self {
            inner: Mutex::new(UserData {
                balances: defaults.balances,
                free_conversions: defaults.free_conversions,
            }),
        }
    }

    fn data(&self) -> MutexGuard<'_, UserData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryBalanceStore {
    fn default() -> Self {
        Self::new(StoreDefaults::default())
    }
}

impl BalanceStore for MemoryBalanceStore {
    fn get_balances(&self) -> Result<Vec<Balance>> {
        Ok(self.data().balances.clone())
    }

    fn set_balances(&self, balances: &[Balance]) -> Result<()> {
        debug!(count = balances.len(), "Memory store PUT balances");
        self.data().balances = balances.to_vec();
        Ok(())
    }

    fn get_free_conversions(&self) -> Result<u32> {
        Ok(self.data().free_conversions)
    }

    fn decrement_free_conversions(&self) -> Result<()> {
        let mut data = self.data();
        data.free_conversions = data.free_conversions.saturating_sub(1);
        Ok(())
    }

    fn commit_conversion(&self, balances: &[Balance]) -> Result<u32> {
        let mut data = self.data();
        data.balances = balances.to_vec();
        data.free_conversions = data.free_conversions.saturating_sub(1);
        debug!(free_conversions = data.free_conversions, "Memory store COMMIT");
        Ok(data.free_conversions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_until_written() {
        let store = MemoryBalanceStore::default();

        let balances = store.get_balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0], Balance::new(Currency::eur(), dec!(1000.00)));
        assert_eq!(balances[1], Balance::new(Currency::usd(), dec!(0)));
        assert_eq!(store.get_free_conversions().unwrap(), 5);
    }

    #[test]
    fn test_set_balances() {
        let store = MemoryBalanceStore::default();
        let updated = vec![Balance::new(Currency::usd(), dec!(12.34))];

        store.set_balances(&updated).unwrap();
        assert_eq!(store.get_balances().unwrap(), updated);
    }

    #[test]
    fn test_decrement_stops_at_zero() {
        let store = MemoryBalanceStore::new(StoreDefaults {
            free_conversions: 1,
            ..StoreDefaults::default()
        });

        store.decrement_free_conversions().unwrap();
        store.decrement_free_conversions().unwrap();
        assert_eq!(store.get_free_conversions().unwrap(), 0);
    }

    #[test]
    fn test_commit_writes_both_values() {
        let store = MemoryBalanceStore::default();
        let updated = vec![
            Balance::new(Currency::eur(), dec!(900.00)),
            Balance::new(Currency::usd(), dec!(110.00)),
        ];

        assert_eq!(store.commit_conversion(&updated).unwrap(), 4);
        assert_eq!(store.get_balances().unwrap(), updated);
        assert_eq!(store.get_free_conversions().unwrap(), 4);
    }
}
