pub mod disk;
pub mod memory;

use crate::core::balance::BalanceStore;
use crate::core::config::AppConfig;
use disk::DiskBalanceStore;
use memory::MemoryBalanceStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the on-disk balance store under the configured data directory.
///
/// Falls back to an in-memory store when the directory cannot be resolved or
/// the keyspace fails to open, so the exchange keeps working for the session.
pub fn open_balance_store(config: &AppConfig) -> Arc<dyn BalanceStore> {
    let defaults = config.store_defaults();
    let opened = config
        .data_path()
        .and_then(|path| DiskBalanceStore::open(&path.join("store"), defaults.clone()));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Balance store unavailable, balances will not be saved");
            Arc::new(MemoryBalanceStore::new(defaults))
        }
    }
}
