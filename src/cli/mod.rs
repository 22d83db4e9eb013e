//! Terminal front-end over the exchange core

pub mod balances;
pub mod convert;
pub mod rates;
pub mod session;
pub mod setup;
pub mod ui;
