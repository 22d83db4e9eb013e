use crate::core::balance::{Balance, BalanceStore, StoreDefaults};
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "user_data";
const BALANCES_KEY: &str = "balances";
const FREE_CONVERSIONS_KEY: &str = "free_conversions";

/// Balance store backed by a fjall keyspace. Values are stored as JSON.
pub struct DiskBalanceStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    defaults: StoreDefaults,
}

impl DiskBalanceStore {
    pub fn open(path: &Path, defaults: StoreDefaults) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open user data partition")?;
        debug!("Opened balance store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
            defaults,
        })
    }

    fn read<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        match self.partition.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt value stored under '{key}'"))?;
                debug!("Store HIT for key: {}", key);
                Ok(Some(value))
            }
            None => {
                debug!("Store MISS for key: {}", key);
                Ok(None)
            }
        }
    }

    fn encode<V: Serialize>(value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist balance store")
    }
}

impl BalanceStore for DiskBalanceStore {
    fn get_balances(&self) -> Result<Vec<Balance>> {
        Ok(self
            .read(BALANCES_KEY)?
            .unwrap_or_else(|| self.defaults.balances.clone()))
    }

    fn set_balances(&self, balances: &[Balance]) -> Result<()> {
        self.partition
            .insert(BALANCES_KEY, Self::encode(&balances)?)?;
        debug!("Store PUT for key: {}", BALANCES_KEY);
        self.persist()
    }

    fn get_free_conversions(&self) -> Result<u32> {
        Ok(self
            .read(FREE_CONVERSIONS_KEY)?
            .unwrap_or(self.defaults.free_conversions))
    }

    fn decrement_free_conversions(&self) -> Result<()> {
        let current = self.get_free_conversions()?;
        if current == 0 {
            return Ok(());
        }
        self.partition
            .insert(FREE_CONVERSIONS_KEY, Self::encode(&(current - 1))?)?;
        debug!("Store PUT for key: {}", FREE_CONVERSIONS_KEY);
        self.persist()
    }

    fn commit_conversion(&self, balances: &[Balance]) -> Result<u32> {
        let remaining = self.get_free_conversions()?.saturating_sub(1);

        let mut batch = self.keyspace.batch();
        batch.insert(&self.partition, BALANCES_KEY, Self::encode(&balances)?);
        batch.insert(&self.partition, FREE_CONVERSIONS_KEY, Self::encode(&remaining)?);
        batch.commit().context("Failed to commit conversion")?;
        self.persist()?;

        debug!(free_conversions = remaining, "Store COMMIT conversion");
        Ok(remaining)
    }
}
