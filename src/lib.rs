pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::Exchange;
use anyhow::{Context, Result};
use providers::HttpRateSource;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rates,
    Balances,
    Convert {
        sell: String,
        receive: String,
        amount: String,
    },
    Session,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Exchanger starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let exchange = build_exchange(&config)?;

    match command {
        AppCommand::Rates => cli::rates::run(&exchange).await,
        AppCommand::Balances => {
            cli::balances::run(&exchange);
            Ok(())
        }
        AppCommand::Convert {
            sell,
            receive,
            amount,
        } => cli::convert::run(&exchange, &sell, &receive, &amount).await,
        AppCommand::Session => cli::session::run(&exchange).await,
    }
}

/// Wires the HTTP rate source and the balance store into an exchange.
pub fn build_exchange(config: &AppConfig) -> Result<Exchange> {
    let rates = &config.providers.rates;
    let rate_source = HttpRateSource::new(&rates.base_url, rates.retries)
        .context("Failed to create the rate client")?;
    let store = store::open_balance_store(config);

    Exchange::new(config.exchange_settings(), Arc::new(rate_source), store)
        .context("Invalid exchange configuration")
}
