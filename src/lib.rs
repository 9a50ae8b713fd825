//! Quick Flip Scalper
//!
//! Intraday opening-range reversal scalper for US equities: builds the
//! opening box, filters sessions by daily ATR, scans for reversal candles
//! that pierce the box, and emits at most one trade per symbol per day.
//! The same session pipeline drives live signalling, historical backtests,
//! multi-symbol leaderboards and parameter optimization.
//!
//! ```
//! use quick_flip_scalper::Money;
//!
//! let entry = Money::cents(144.499);
//! assert_eq!(entry.to_string(), "144.50");
//! ```

pub mod alpaca;
pub mod backtest;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod live;
pub mod optimizer;
pub mod portfolio;
pub mod publisher;
pub mod quick_flip;
pub mod types;

pub use config::Config;
pub use error::{ProviderError, ScalperError};
pub use types::*;
