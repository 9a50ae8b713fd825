//! Quick Flip opening-range reversal strategy
//!
//! Range from the first 15 minutes of the session, ATR liquidity filter,
//! then a reversal candle back toward the box after price pierces it.
//!
//! Core Logic:
//! 1. Box = high/low of the opening 15m bar (or the first three 5m bars)
//! 2. Box range must be >= threshold * daily ATR (prior days only)
//! 3. Bar pierces the box low -> look for hammer / bullish engulfing
//!    Bar pierces the box high -> look for inverted hammer / bearish engulfing
//! 4. First match is the day's only trade; target is the opposite box edge

mod config;
pub mod opening_range;
pub mod params;
pub mod patterns;
pub mod session;
pub mod simulator;
pub mod volatility;

pub use config::{ProfitTarget, StopRule, StrategyConfig};
pub use opening_range::{build_box, BoxSource};
pub use params::{build_candidate, trade_levels, TradeLevels};
pub use patterns::{
    is_bearish_engulfing, is_bullish_engulfing, is_hammer, is_inverted_hammer, PatternRules,
};
pub use session::{replay_day, DayInputs, DayResult, DayStatus, SessionScanner, SessionState};
pub use simulator::simulate;
pub use volatility::{check_liquidity, daily_atr, LiquidityCheck};
