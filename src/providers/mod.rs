pub mod exchange_rates;
pub mod util;

pub use exchange_rates::HttpRateSource;
