use crate::core::balance::{Balance, StoreDefaults};
use crate::core::conversion::DEFAULT_COMMISSION_PERCENT;
use crate::core::currency::{Currency, CurrencyRegistry};
use crate::core::exchange::ExchangeSettings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_RATES_URL: &str = "https://developers.paysera.com/tasks";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesProviderConfig {
    pub base_url: String,
    /// Extra attempts after the first failed request.
    #[serde(default)]
    pub retries: usize,
}

impl Default for RatesProviderConfig {
    fn default() -> Self {
        RatesProviderConfig {
            base_url: DEFAULT_RATES_URL.to_string(),
            retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub rates: RatesProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub currencies: Vec<Currency>,
    pub sell_currency: Currency,
    pub receive_currency: Currency,
    pub commission_percent: Decimal,
    pub free_conversions: u32,
    pub initial_balances: Vec<Balance>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let store = StoreDefaults::default();
        AppConfig {
            providers: ProvidersConfig::default(),
            currencies: CurrencyRegistry::default().iter().cloned().collect(),
            sell_currency: Currency::eur(),
            receive_currency: Currency::usd(),
            commission_percent: DEFAULT_COMMISSION_PERCENT,
            free_conversions: store.free_conversions,
            initial_balances: store.balances,
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or defaults if there is
    /// no config file yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory holding the balance store.
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "exchanger", "exchanger")
            .context("Could not determine project directories")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn store_defaults(&self) -> StoreDefaults {
        StoreDefaults {
            balances: self.initial_balances.clone(),
            free_conversions: self.free_conversions,
        }
    }

    pub fn exchange_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            currencies: CurrencyRegistry::new(self.currencies.iter().cloned()),
            sell_currency: self.sell_currency.clone(),
            receive_currency: self.receive_currency.clone(),
            commission_percent: self.commission_percent,
        }
    }
}
