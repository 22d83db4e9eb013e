//! Exchange domain: currencies, balances, the conversion engine and the
//! orchestrator that ties them together

pub mod balance;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod error;
pub mod exchange;
pub mod log;

// Re-export main types for cleaner imports
pub use balance::{Balance, BalanceStore, StoreDefaults};
pub use conversion::{ConversionRequest, Preview};
pub use currency::{Currency, CurrencyRegistry, RateSnapshot, RateSource};
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{
    ConversionResult, Exchange, ExchangeEvent, ExchangeSettings, ExchangeView, RefreshOutcome,
    Side,
};
