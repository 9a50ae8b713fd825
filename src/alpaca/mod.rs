//! Alpaca market-data provider
//!
//! Requires `ALPACA_API_KEY` and `ALPACA_SECRET_KEY`.

mod client;
pub mod types;

pub use client::{AlpacaCredentials, AlpacaProvider, ALPACA_DATA_BASE};
